//! The built-in function families, one file per group the way the teacher
//! splits `formualizer-eval::builtins::{math,text,lookup,logical,...}`.
//! Every function here has the `BuiltinFn` shape from `crate::function`.

pub mod lookup;
pub mod logical;
pub mod math;
pub mod reference_fns;
pub mod text;

use crate::interpreter::CellValue;
use crate::function::Call;
use sheetcalc_parse::NodeId;
use sheetcalc_common::{CalcError, ErrorKind};

/// Evaluate every argument; any `Array` result is spliced in (flattened one
/// level), matching spec.md §4.6's "accept either a single range/array
/// argument ... or a variadic list of numbers" for the reducers.
pub(crate) fn flatten_args(call: &mut Call, argv: &[NodeId]) -> Vec<CellValue> {
    let mut out = Vec::new();
    for &id in argv {
        match call.value(id) {
            CellValue::Array(items) => out.extend(items),
            other => out.push(other),
        }
    }
    out
}

pub(crate) fn first_error(values: &[CellValue]) -> Option<CalcError> {
    values.iter().find_map(|v| match v {
        CellValue::Error(e) => Some(*e),
        _ => None,
    })
}

pub(crate) fn numeric_of(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n),
        _ => None,
    }
}

/// Lift a scalar `f64 -> CellValue` function over a (possibly array)
/// argument. Blank and Error propagate unchanged; a `Text` operand is a
/// type error; array elements are mapped independently, so a blank element
/// inside an array is preserved rather than tripping the whole call.
pub(crate) fn map_scalar(value: CellValue, f: impl Fn(f64) -> CellValue + Copy) -> CellValue {
    match value {
        CellValue::Number(n) => f(n),
        CellValue::Blank => CellValue::Blank,
        CellValue::Error(e) => CellValue::Error(e),
        CellValue::Text(_) => CellValue::Error(CalcError::new(ErrorKind::Type)),
        CellValue::Array(items) => CellValue::Array(items.into_iter().map(|v| map_scalar(v, f)).collect()),
    }
}

/// Lift a scalar `(f64, f64) -> CellValue` function over a pair of
/// (possibly array) operands, with the same broadcasting rules as
/// `sheetcalc_eval::interpreter`'s binary-operator evaluation: equal-length
/// arrays zip, a scalar paired with an array is replicated, mismatched
/// lengths are a shape error.
pub(crate) fn zip_scalar(
    a: CellValue,
    b: CellValue,
    f: impl Fn(f64, f64) -> CellValue + Copy,
) -> CellValue {
    match (a, b) {
        (CellValue::Error(e), _) | (_, CellValue::Error(e)) => CellValue::Error(e),
        (CellValue::Blank, _) | (_, CellValue::Blank) => CellValue::Blank,
        (CellValue::Array(l), CellValue::Array(r)) => {
            if l.len() != r.len() {
                return CellValue::Error(CalcError::new(ErrorKind::Shape));
            }
            CellValue::Array(
                l.into_iter()
                    .zip(r)
                    .map(|(x, y)| zip_scalar(x, y, f))
                    .collect(),
            )
        }
        (CellValue::Array(l), scalar) => {
            CellValue::Array(l.into_iter().map(|x| zip_scalar(x, scalar.clone(), f)).collect())
        }
        (scalar, CellValue::Array(r)) => {
            CellValue::Array(r.into_iter().map(|y| zip_scalar(scalar.clone(), y, f)).collect())
        }
        (CellValue::Number(x), CellValue::Number(y)) => f(x, y),
        _ => CellValue::Error(CalcError::new(ErrorKind::Type)),
    }
}

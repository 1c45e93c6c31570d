//! Arithmetic and reducer built-ins, grounded on `drspread_formula_funcs.c`'s
//! `FUNC1`..`FUNC4` arrays (see SPEC_FULL.md §9) and spec.md §4.6.

use super::{first_error, flatten_args, map_scalar, numeric_of, zip_scalar};
use crate::function::Call;
use crate::interpreter::CellValue;
use sheetcalc_common::ErrorKind;
use sheetcalc_parse::NodeId;

pub fn sum(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let values = flatten_args(call, argv);
    if let Some(e) = first_error(&values) {
        return call.error_with(e);
    }
    let total: f64 = values.iter().filter_map(numeric_of).sum();
    call.number(total)
}

pub fn prod(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let values = flatten_args(call, argv);
    if let Some(e) = first_error(&values) {
        return call.error_with(e);
    }
    let total: f64 = values.iter().filter_map(numeric_of).product();
    call.number(total)
}

pub fn avg(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let values = flatten_args(call, argv);
    if let Some(e) = first_error(&values) {
        return call.error_with(e);
    }
    let nums: Vec<f64> = values.iter().filter_map(numeric_of).collect();
    if nums.is_empty() {
        return call.error(ErrorKind::Domain);
    }
    call.number(nums.iter().sum::<f64>() / nums.len() as f64)
}

pub fn count(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let values = flatten_args(call, argv);
    if let Some(e) = first_error(&values) {
        return call.error_with(e);
    }
    let n = values
        .iter()
        .filter(|v| matches!(v, CellValue::Number(_) | CellValue::Text(_)))
        .count();
    call.number(n as f64)
}

pub fn min(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let values = flatten_args(call, argv);
    if let Some(e) = first_error(&values) {
        return call.error_with(e);
    }
    match values.iter().filter_map(numeric_of).fold(None, |acc, n| {
        Some(acc.map_or(n, |m: f64| m.min(n)))
    }) {
        Some(m) => call.number(m),
        None => call.error(ErrorKind::Domain),
    }
}

pub fn max(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let values = flatten_args(call, argv);
    if let Some(e) = first_error(&values) {
        return call.error_with(e);
    }
    match values.iter().filter_map(numeric_of).fold(None, |acc, n| {
        Some(acc.map_or(n, |m: f64| m.max(n)))
    }) {
        Some(m) => call.number(m),
        None => call.error(ErrorKind::Domain),
    }
}

/// The d20-ability-modifier formula: `floor((n - 10) / 2)`.
pub fn modifier(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 1 {
        return call.error(ErrorKind::Arity);
    }
    let v = call.value(argv[0]);
    let result = map_scalar(v, |n| CellValue::Number(((n - 10.0) / 2.0).floor()));
    call.push_value(&result)
}

pub fn abs(call: &mut Call, argv: &[NodeId]) -> NodeId {
    unary_math(call, argv, f64::abs)
}

pub fn floor(call: &mut Call, argv: &[NodeId]) -> NodeId {
    unary_math(call, argv, f64::floor)
}

pub fn ceil(call: &mut Call, argv: &[NodeId]) -> NodeId {
    unary_math(call, argv, f64::ceil)
}

pub fn trunc(call: &mut Call, argv: &[NodeId]) -> NodeId {
    unary_math(call, argv, f64::trunc)
}

/// `__builtin_round` in the original C source — round-half-away-from-zero,
/// which is exactly what `f64::round` already does in Rust.
pub fn round(call: &mut Call, argv: &[NodeId]) -> NodeId {
    unary_math(call, argv, f64::round)
}

pub fn sqrt(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 1 {
        return call.error(ErrorKind::Arity);
    }
    let v = call.value(argv[0]);
    let result = map_scalar(v, |n| {
        if n < 0.0 {
            CellValue::Error(sheetcalc_common::CalcError::new(ErrorKind::Domain))
        } else {
            CellValue::Number(n.sqrt())
        }
    });
    call.push_value(&result)
}

fn unary_math(call: &mut Call, argv: &[NodeId], f: fn(f64) -> f64) -> NodeId {
    if argv.len() != 1 {
        return call.error(ErrorKind::Arity);
    }
    let v = call.value(argv[0]);
    let result = map_scalar(v, |n| CellValue::Number(f(n)));
    call.push_value(&result)
}

pub fn pow(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 2 {
        return call.error(ErrorKind::Arity);
    }
    let a = call.value(argv[0]);
    let b = call.value(argv[1]);
    let result = zip_scalar(a, b, |x, y| CellValue::Number(x.powf(y)));
    call.push_value(&result)
}

/// `log(x)` is natural log; `log(x, base)` with `base > 1` converts to
/// log-in-base.
pub fn log(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.is_empty() || argv.len() > 2 {
        return call.error(ErrorKind::Arity);
    }
    let x = call.value(argv[0]);
    if argv.len() == 1 {
        let result = map_scalar(x, |n| {
            if n <= 0.0 {
                CellValue::Error(sheetcalc_common::CalcError::new(ErrorKind::Domain))
            } else {
                CellValue::Number(n.ln())
            }
        });
        return call.push_value(&result);
    }
    let base = call.value(argv[1]);
    let result = zip_scalar(x, base, |n, b| {
        if n <= 0.0 || b <= 1.0 {
            CellValue::Error(sheetcalc_common::CalcError::new(ErrorKind::Domain))
        } else {
            CellValue::Number(n.log(b))
        }
    });
    call.push_value(&result)
}

/// Parse a leading double out of `bytes`: optional sign, digits, optional
/// fractional part, optional exponent — `+.5`, `-.2`, `.3` all accepted.
fn parse_leading_f64(bytes: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(bytes).ok()?.trim();
    let mut end = 0;
    let b = s.as_bytes();
    if end < b.len() && (b[end] == b'+' || b[end] == b'-') {
        end += 1;
    }
    let mut saw_digit = false;
    while end < b.len() && b[end].is_ascii_digit() {
        end += 1;
        saw_digit = true;
    }
    if end < b.len() && b[end] == b'.' {
        end += 1;
        while end < b.len() && b[end].is_ascii_digit() {
            end += 1;
            saw_digit = true;
        }
    }
    if !saw_digit {
        return None;
    }
    if end < b.len() && (b[end] == b'e' || b[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < b.len() && (b[exp_end] == b'+' || b[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_start = exp_end;
        while exp_end < b.len() && b[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok()
}

/// `num(x, default=0)`: coerce to number. Strings are parsed for a leading
/// double; anything else yields the default. Propagates over arrays.
pub fn num(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.is_empty() || argv.len() > 2 {
        return call.error(ErrorKind::Arity);
    }
    let default = if argv.len() == 2 {
        match call.value(argv[1]) {
            CellValue::Number(n) => n,
            _ => 0.0,
        }
    } else {
        0.0
    };
    let v = call.value(argv[0]);
    let result = coerce_num(call, v, default);
    call.push_value(&result)
}

fn coerce_num(call: &mut Call, value: CellValue, default: f64) -> CellValue {
    match value {
        CellValue::Number(n) => CellValue::Number(n),
        CellValue::Blank => CellValue::Number(default),
        CellValue::Error(e) => CellValue::Error(e),
        CellValue::Text(a) => {
            let bytes = call.ctx.atoms().get(a);
            match parse_leading_f64(bytes) {
                Some(n) => CellValue::Number(n),
                None => CellValue::Number(default),
            }
        }
        CellValue::Array(items) => {
            CellValue::Array(items.into_iter().map(|v| coerce_num(call, v, default)).collect())
        }
    }
}

//! `cat` — string concatenation (spec.md §4.6).

use super::first_error;
use crate::function::Call;
use crate::interpreter::CellValue;
use sheetcalc_common::ErrorKind;
use sheetcalc_parse::{Expr, NodeId};

/// Render a number the way the host displays it: integral values print
/// without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn cat_scalar(call: &mut Call, values: &[CellValue]) -> CellValue {
    if let Some(e) = first_error(values) {
        return CellValue::Error(e);
    }
    let mut buf = Vec::new();
    for v in values {
        match v {
            CellValue::Blank => {}
            CellValue::Number(n) => buf.extend(format_number(*n).into_bytes()),
            CellValue::Text(a) => buf.extend_from_slice(call.ctx.atoms().get(*a)),
            CellValue::Error(_) => unreachable!("checked by first_error above"),
            CellValue::Array(_) => {}
        }
    }
    let atom = call.ctx.atoms_mut().intern(&buf);
    CellValue::Text(atom)
}

/// `cat(a, b, ...)`: concatenate text representations. Arrays broadcast
/// element-wise; a shorter array's missing slots contribute a blank; the
/// result's length is the longest input array's length.
pub fn cat(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.is_empty() || argv.len() > 4 {
        return call.error(ErrorKind::Arity);
    }
    let values: Vec<CellValue> = argv.iter().map(|&id| call.value(id)).collect();
    let is_array = values.iter().any(|v| matches!(v, CellValue::Array(_)));
    if !is_array {
        let result = cat_scalar(call, &values);
        return call.push_value(&result);
    }
    let max_len = values
        .iter()
        .map(|v| match v {
            CellValue::Array(items) => items.len(),
            _ => 1,
        })
        .max()
        .unwrap_or(1);
    let data: Vec<NodeId> = (0..max_len)
        .map(|i| {
            let slice: Vec<CellValue> = values
                .iter()
                .map(|v| match v {
                    CellValue::Array(items) => items.get(i).cloned().unwrap_or(CellValue::Blank),
                    other => other.clone(),
                })
                .collect();
            let piece = cat_scalar(call, &slice);
            call.push_value(&piece)
        })
        .collect();
    call.push(Expr::ComputedArray { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, NullSink};
    use crate::sheet::SheetHandle;
    use sheetcalc_parse::ParseArena;

    fn new_call<'c, 't>(ctx: &'c mut Context, tree: &'t mut ParseArena) -> Call<'c, 't> {
        Call {
            ctx,
            tree,
            sheet: SheetHandle(0),
            row: 0,
            col: 0,
        }
    }

    #[test]
    fn cat_joins_text_and_integral_number_without_decimal() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let hi = ctx.atoms_mut().intern(b"n=");
        let a = tree.push(Expr::String(hi));
        let b = tree.push(Expr::Number(5.0));
        let mut call = new_call(&mut ctx, &mut tree);
        let id = cat(&mut call, &[a, b]);
        match tree.get(id) {
            Expr::String(atom) => assert_eq!(call.ctx.atoms().get(*atom), b"n=5"),
            other => panic!("expected string, got {other:?}"),
        }
    }

    #[test]
    fn cat_propagates_an_argument_error() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let err = tree.push(Expr::Error(sheetcalc_common::CalcError::new(ErrorKind::Domain)));
        let n = tree.push(Expr::Number(1.0));
        let mut call = new_call(&mut ctx, &mut tree);
        let id = cat(&mut call, &[err, n]);
        assert!(matches!(tree.get(id), Expr::Error(e) if e.kind == ErrorKind::Domain));
    }
}

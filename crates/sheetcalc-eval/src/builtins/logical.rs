//! `if`/`try` — the two control-flow built-ins (spec.md §4.6).

use crate::function::Call;
use crate::interpreter::CellValue;
use sheetcalc_common::ErrorKind;
use sheetcalc_parse::{Expr, NodeId};

/// `try(a, b)`: evaluate `a`; if it is an error, evaluate and return `b`.
pub fn try_fn(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 2 {
        return call.error(ErrorKind::Arity);
    }
    let a = call.eval(argv[0]);
    if matches!(call.tree.get(a), Expr::Error(_)) {
        return call.eval(argv[1]);
    }
    a
}

fn broadcast_to(value: &CellValue, n: usize) -> Option<Vec<CellValue>> {
    match value {
        CellValue::Array(items) => {
            if items.len() == n {
                Some(items.clone())
            } else {
                None
            }
        }
        scalar => Some(std::iter::repeat(scalar.clone()).take(n).collect()),
    }
}

/// `if(cond, t, f)`: a scalar condition just picks a branch to evaluate; an
/// array-like condition produces a computed array the same length, pulling
/// positionally from `t`/`f` (each replicated if it is itself a scalar).
pub fn if_fn(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 3 {
        return call.error(ErrorKind::Arity);
    }
    let cond = call.value(argv[0]);
    match cond {
        CellValue::Error(e) => call.error_with(e),
        CellValue::Array(conds) => {
            let t = call.value(argv[1]);
            let f = call.value(argv[2]);
            let n = conds.len();
            match (broadcast_to(&t, n), broadcast_to(&f, n)) {
                (Some(ts), Some(fs)) => {
                    let data: Vec<NodeId> = conds
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            let chosen = if c.is_truthy() { &ts[i] } else { &fs[i] };
                            call.push_value(chosen)
                        })
                        .collect();
                    call.push(Expr::ComputedArray { data })
                }
                _ => call.error(ErrorKind::Shape),
            }
        }
        scalar => {
            let branch = if scalar.is_truthy() { argv[1] } else { argv[2] };
            call.eval(branch)
        }
    }
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
    fn if_with_truthy_numeric_condition_takes_the_first_branch() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let cond = tree.push(Expr::Number(1.0));
        let t = tree.push(Expr::Number(2.0));
        let f = tree.push(Expr::Number(3.0));
        let mut call = new_call(&mut ctx, &mut tree);
        let id = if_fn(&mut call, &[cond, t, f]);
        assert!(matches!(tree.get(id), Expr::Number(n) if *n == 2.0));
    }

    #[test]
    fn if_with_empty_string_condition_is_falsy() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let empty = tree.push(Expr::String(sheetcalc_common::Atom::NIL));
        let t = tree.push(Expr::Number(2.0));
        let f = tree.push(Expr::Number(3.0));
        let mut call = new_call(&mut ctx, &mut tree);
        let id = if_fn(&mut call, &[empty, t, f]);
        assert!(matches!(tree.get(id), Expr::Number(n) if *n == 3.0));
    }

    #[test]
    fn try_falls_back_on_error() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let err = tree.push(Expr::Error(sheetcalc_common::CalcError::new(ErrorKind::Domain)));
        let fallback = tree.push(Expr::Number(9.0));
        let mut call = new_call(&mut ctx, &mut tree);
        let id = try_fn(&mut call, &[err, fallback]);
        assert!(matches!(tree.get(id), Expr::Number(n) if *n == 9.0));
    }
}

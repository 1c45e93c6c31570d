//! `tlu`/`find` — table lookup built-ins (spec.md §4.6).

use crate::function::Call;
use crate::interpreter::CellValue;
use sheetcalc_common::{CalcError, ErrorKind};
use sheetcalc_parse::{Expr, NodeId};

fn as_vec(value: CellValue) -> Vec<CellValue> {
    match value {
        CellValue::Array(items) => items,
        other => vec![other],
    }
}

fn values_equal(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::Number(x), CellValue::Number(y)) => x == y,
        (CellValue::Text(x), CellValue::Text(y)) => x == y,
        (CellValue::Blank, CellValue::Blank) => true,
        _ => false,
    }
}

fn locate(needle: &CellValue, haystack: &[CellValue]) -> Option<usize> {
    haystack.iter().position(|h| values_equal(needle, h))
}

/// `find(needle, haystack, default?)`: 1-based index of `needle` within
/// `haystack`, or `default` if given, or a domain error.
pub fn find(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() < 2 || argv.len() > 3 {
        return call.error(ErrorKind::Arity);
    }
    let needle = call.value(argv[0]);
    let haystack = as_vec(call.value(argv[1]));
    let default = if argv.len() == 3 {
        Some(call.value(argv[2]))
    } else {
        None
    };
    let find_one = |n: &CellValue| -> CellValue {
        match locate(n, &haystack) {
            Some(idx) => CellValue::Number((idx + 1) as f64),
            None => default
                .clone()
                .unwrap_or_else(|| CellValue::Error(CalcError::new(ErrorKind::Domain))),
        }
    };
    match needle {
        CellValue::Array(items) => {
            let data: Vec<NodeId> = items
                .iter()
                .map(|n| {
                    let v = find_one(n);
                    call.push_value(&v)
                })
                .collect();
            call.push(Expr::ComputedArray { data })
        }
        scalar => {
            let v = find_one(&scalar);
            call.push_value(&v)
        }
    }
}

/// `tlu(needle, haystack, values, default?)`: the value paired with `needle`'s
/// first match in `haystack`, by position in `values`. `default`, when given,
/// is evaluated at most once and reused for every miss (it is evaluated here
/// exactly once regardless of how many needles miss, whether `needle` is a
/// scalar or an array).
pub fn tlu(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() < 3 || argv.len() > 4 {
        return call.error(ErrorKind::Arity);
    }
    let needle = call.value(argv[0]);
    let haystack = as_vec(call.value(argv[1]));
    let values = as_vec(call.value(argv[2]));
    let default = if argv.len() == 4 {
        Some(call.value(argv[3]))
    } else {
        None
    };
    let lookup_one = |n: &CellValue| -> CellValue {
        match locate(n, &haystack) {
            Some(idx) => values
                .get(idx)
                .cloned()
                .unwrap_or_else(|| CellValue::Error(CalcError::new(ErrorKind::Domain))),
            None => default
                .clone()
                .unwrap_or_else(|| CellValue::Error(CalcError::new(ErrorKind::Domain))),
        }
    };
    match needle {
        CellValue::Array(items) => {
            let data: Vec<NodeId> = items
                .iter()
                .map(|n| {
                    let v = lookup_one(n);
                    call.push_value(&v)
                })
                .collect();
            call.push(Expr::ComputedArray { data })
        }
        scalar => {
            let v = lookup_one(&scalar);
            call.push_value(&v)
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
    fn tlu_finds_the_paired_value() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let a = ctx.atoms_mut().intern(b"a");
        let b = ctx.atoms_mut().intern(b"b");
        let needle = tree.push(Expr::String(b));
        let haystack = tree.push(Expr::ComputedArray {
            data: vec![tree.push(Expr::String(a)), tree.push(Expr::String(b))],
        });
        let values = tree.push(Expr::ComputedArray {
            data: vec![tree.push(Expr::Number(1.0)), tree.push(Expr::Number(2.0))],
        });
        let mut call = new_call(&mut ctx, &mut tree);
        let id = tlu(&mut call, &[needle, haystack, values]);
        assert!(matches!(tree.get(id), Expr::Number(n) if *n == 2.0));
    }

    #[test]
    fn tlu_without_default_errors_on_miss() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let a = ctx.atoms_mut().intern(b"a");
        let missing = ctx.atoms_mut().intern(b"z");
        let needle = tree.push(Expr::String(missing));
        let haystack = tree.push(Expr::ComputedArray {
            data: vec![tree.push(Expr::String(a))],
        });
        let values = tree.push(Expr::ComputedArray {
            data: vec![tree.push(Expr::Number(1.0))],
        });
        let mut call = new_call(&mut ctx, &mut tree);
        let id = tlu(&mut call, &[needle, haystack, values]);
        assert!(matches!(tree.get(id), Expr::Error(e) if e.kind == ErrorKind::Domain));
    }

    #[test]
    fn find_returns_one_based_index() {
        let mut ctx = Context::new(Box::new(NullSink));
        let mut tree = ParseArena::new();
        let needle = tree.push(Expr::Number(7.0));
        let haystack = tree.push(Expr::ComputedArray {
            data: vec![
                tree.push(Expr::Number(5.0)),
                tree.push(Expr::Number(7.0)),
                tree.push(Expr::Number(9.0)),
            ],
        });
        let mut call = new_call(&mut ctx, &mut tree);
        let id = find(&mut call, &[needle, haystack]);
        assert!(matches!(tree.get(id), Expr::Number(n) if *n == 2.0));
    }
}

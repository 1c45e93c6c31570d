//! `cell`/`col`/`row`/`eval`/`call`/`array` — reference and meta built-ins
//! (spec.md §4.6, §6).

use crate::function::Call;
use crate::interpreter::{self, CellValue};
use sheetcalc_common::Atom;
use sheetcalc_common::ErrorKind;
use sheetcalc_parse::{Expr, NodeId};

/// Expect a text value, re-interned lowercase so it can be used as a
/// column/sheet name the way parsed identifiers already are.
fn resolve_name_value(call: &mut Call, value: CellValue) -> Result<Atom, NodeId> {
    match value {
        CellValue::Text(a) => {
            let bytes = call.ctx.atoms().get(a).to_vec();
            Ok(call.ctx.atoms_mut().intern_lower(&bytes))
        }
        CellValue::Error(e) => Err(call.error_with(e)),
        _ => Err(call.error(ErrorKind::Type)),
    }
}

/// Evaluate `id` expecting a text result. See `resolve_name_value`.
fn resolve_name_arg(call: &mut Call, id: NodeId) -> Result<Atom, NodeId> {
    let value = call.value(id);
    resolve_name_value(call, value)
}

fn as_row_number(call: &mut Call, id: NodeId) -> Result<i32, NodeId> {
    match call.value(id) {
        CellValue::Number(n) => Ok(n as i32),
        CellValue::Error(e) => Err(call.error_with(e)),
        _ => Err(call.error(ErrorKind::Type)),
    }
}

/// `cell('name')`, `cell('col', rowIdx)`, `cell('sheet', 'name')`,
/// `cell('sheet', 'col', rowIdx)`: named or positional single-cell fetch,
/// optionally crossing to another sheet. The 2-argument form is disambiguated
/// by the second argument's type: a number means `(col, rowIdx)` on the
/// current sheet, text means `(sheet, name)`.
pub fn cell(call: &mut Call, argv: &[NodeId]) -> NodeId {
    match argv.len() {
        1 => {
            let col_name = match resolve_name_arg(call, argv[0]) {
                Ok(a) => a,
                Err(id) => return id,
            };
            let node = call.push(Expr::Range1DColumn {
                col_name,
                row_start: 0,
                row_end: -1,
            });
            call.eval(node)
        }
        2 => {
            let second = call.value(argv[1]);
            match second {
                CellValue::Number(n) => {
                    let col_name = match resolve_name_arg(call, argv[0]) {
                        Ok(a) => a,
                        Err(id) => return id,
                    };
                    let node = call.push(Expr::Range0D {
                        col_name,
                        row: n as i32 - 1,
                    });
                    call.eval(node)
                }
                other => {
                    let col_name = match resolve_name_value(call, other) {
                        Ok(a) => a,
                        Err(id) => return id,
                    };
                    let sheet = match resolve_name_arg(call, argv[0]) {
                        Ok(a) => a,
                        Err(id) => return id,
                    };
                    let node = call.push(Expr::ForeignRange1DColumn {
                        sheet,
                        col_name,
                        row_start: 0,
                        row_end: -1,
                    });
                    call.eval(node)
                }
            }
        }
        3 => {
            let sheet = match resolve_name_arg(call, argv[0]) {
                Ok(a) => a,
                Err(id) => return id,
            };
            let col_name = match resolve_name_arg(call, argv[1]) {
                Ok(a) => a,
                Err(id) => return id,
            };
            let n = match as_row_number(call, argv[2]) {
                Ok(v) => v,
                Err(id) => return id,
            };
            let node = call.push(Expr::ForeignRange0D {
                sheet,
                col_name,
                row: n - 1,
            });
            call.eval(node)
        }
        _ => call.error(ErrorKind::Arity),
    }
}

/// `col(name)`, `col(name, n)`, `col(name, start, end)`: the runtime
/// counterpart of a bracket column range literal, 1-based like the grammar.
pub fn col(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.is_empty() || argv.len() > 3 {
        return call.error(ErrorKind::Arity);
    }
    let col_name = match resolve_name_arg(call, argv[0]) {
        Ok(a) => a,
        Err(id) => return id,
    };
    let expr = match argv.len() {
        1 => Expr::Range1DColumn {
            col_name,
            row_start: 0,
            row_end: -1,
        },
        2 => {
            let n = match as_row_number(call, argv[1]) {
                Ok(v) => v,
                Err(id) => return id,
            };
            Expr::Range0D {
                col_name,
                row: n - 1,
            }
        }
        3 => {
            let s = match as_row_number(call, argv[1]) {
                Ok(v) => v,
                Err(id) => return id,
            };
            let e = match as_row_number(call, argv[2]) {
                Ok(v) => v,
                Err(id) => return id,
            };
            Expr::Range1DColumn {
                col_name,
                row_start: s - 1,
                row_end: e - 1,
            }
        }
        _ => unreachable!(),
    };
    let node = call.push(expr);
    call.eval(node)
}

/// `row(colStart, colEnd, n)`: the runtime counterpart of a bracket row range
/// literal.
pub fn row(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 3 {
        return call.error(ErrorKind::Arity);
    }
    let col_start = match resolve_name_arg(call, argv[0]) {
        Ok(a) => a,
        Err(id) => return id,
    };
    let col_end = match resolve_name_arg(call, argv[1]) {
        Ok(a) => a,
        Err(id) => return id,
    };
    let n = match as_row_number(call, argv[2]) {
        Ok(v) => v,
        Err(id) => return id,
    };
    let node = call.push(Expr::Range1DRow {
        col_start,
        col_end,
        row: n - 1,
    });
    call.eval(node)
}

fn eval_one(call: &mut Call, value: CellValue) -> NodeId {
    match value {
        CellValue::Error(e) => call.error_with(e),
        CellValue::Blank => call.blank(),
        CellValue::Text(atom) => {
            let bytes = call.ctx.atoms().get(atom).to_vec();
            let parsed = sheetcalc_parse::parse(&bytes, &mut call.ctx.atoms, &*crate::function::BUILTINS);
            let mut sub_tree = crate::arena::clone_for_eval(&parsed.arena);
            let result_id = interpreter::eval_expr(
                call.ctx,
                &mut sub_tree,
                call.sheet,
                call.row,
                call.col,
                parsed.root,
            );
            let value = interpreter::extract_cell_value(&sub_tree, result_id);
            call.push_value(&value)
        }
        CellValue::Number(_) | CellValue::Array(_) => call.error(ErrorKind::Type),
    }
}

/// `eval(text)`: re-parse `text` and evaluate it in the caller's (row, col)
/// context. An array argument is mapped element-wise.
pub fn eval(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.len() != 1 {
        return call.error(ErrorKind::Arity);
    }
    match call.value(argv[0]) {
        CellValue::Array(items) => {
            let data: Vec<NodeId> = items.into_iter().map(|item| eval_one(call, item)).collect();
            call.push(Expr::ComputedArray { data })
        }
        other => eval_one(call, other),
    }
}

/// `call('fname', args...)`: dynamic dispatch to another built-in by name.
pub fn call(call: &mut Call, argv: &[NodeId]) -> NodeId {
    if argv.is_empty() {
        return call.error(ErrorKind::Arity);
    }
    let name_atom = match resolve_name_arg(call, argv[0]) {
        Ok(a) => a,
        Err(id) => return id,
    };
    let bytes = call.ctx.atoms().get(name_atom).to_vec();
    let name = match std::str::from_utf8(&bytes) {
        Ok(s) => s,
        Err(_) => return call.error(ErrorKind::Type),
    };
    match crate::function::BUILTINS.lookup(name) {
        Some(id) => crate::function::BUILTINS.call(id, call, &argv[1..]),
        None => call.error(ErrorKind::Reference),
    }
}

/// `array(e1, ..., eN)`: bundle evaluated arguments into a computed array.
pub fn array(call: &mut Call, argv: &[NodeId]) -> NodeId {
    let data: Vec<NodeId> = argv.iter().map(|&id| call.eval(id)).collect();
    call.push(Expr::ComputedArray { data })
}

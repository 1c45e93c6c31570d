//! Top-level evaluation entry points: the bounding-box sweep
//! (`evaluate_formulas`) and the two ad-hoc entries (`evaluate_string`,
//! `evaluate_function`) — spec.md §4.7, §6.

use sheetcalc_common::{CachedResult, CalcError, ErrorKind};

use crate::context::Context;
use crate::interpreter::{self, CellValue};
use crate::sheet::SheetHandle;

/// Walks every cell of every sheet's bounding box, refreshing the display
/// via `ctx`'s `DisplaySink` only where it actually changed since the last
/// pass. Returns the number of cells that evaluated to an error.
pub fn evaluate_formulas(ctx: &mut Context) -> i32 {
    let handles: Vec<SheetHandle> = ctx.sheets().map(|(h, _)| *h).collect();
    let mut nerrs = 0;
    for sheet in handles {
        let (height, width) = match ctx.sheet(sheet) {
            Some(s) => (s.height, s.width),
            None => continue,
        };
        for row in 0..height {
            for col in 0..width {
                let value = interpreter::evaluate_cell(ctx, sheet, row, col);
                if value.is_error() {
                    nerrs += 1;
                }
                let display = interpreter::to_display(&value);
                let unchanged = ctx
                    .sheet(sheet)
                    .and_then(|s| s.last_display.get(&(row, col)))
                    .is_some_and(|prev| *prev == display);
                if unchanged {
                    continue;
                }
                if let Some(s) = ctx.sheet_mut(sheet) {
                    s.last_display.insert((row, col), display);
                }
                emit_display(ctx, sheet, row, col, display);
            }
        }
    }
    nerrs
}

fn emit_display(ctx: &mut Context, sheet: SheetHandle, row: i32, col: i32, display: CachedResult) {
    match display {
        CachedResult::Null => ctx.ops.set_display_string(sheet, row, col, b""),
        CachedResult::Number(n) => ctx.ops.set_display_number(sheet, row, col, n),
        CachedResult::String(a) => {
            let bytes = ctx.atoms().get(a).to_vec();
            ctx.ops.set_display_string(sheet, row, col, &bytes);
        }
        CachedResult::Error(e) => {
            let bytes = match e.message {
                Some(a) => ctx.atoms().get(a).to_vec(),
                None => e.kind.fallback_text().as_bytes().to_vec(),
            };
            ctx.ops.set_display_error(sheet, row, col, &bytes);
        }
    }
}

/// `evaluate_string`: parse and evaluate `bytes` once, outside the parse
/// cache, in the context of `(sheet, row, col)` — for inline/ad-hoc
/// queries that aren't stored as a cell.
pub fn evaluate_string(
    ctx: &mut Context,
    sheet: SheetHandle,
    bytes: &[u8],
    row: i32,
    col: i32,
) -> CellValue {
    let parsed = sheetcalc_parse::parse(bytes, ctx.atoms_mut(), &*crate::function::BUILTINS);
    let mut tree = crate::arena::clone_for_eval(&parsed.arena);
    let result_id = interpreter::eval_expr(ctx, &mut tree, sheet, row, col, parsed.root);
    interpreter::extract_cell_value(&tree, result_id)
}

/// `evaluate_function`: call a function sheet directly from the host, each
/// argument a standalone text snippet parsed in isolation and evaluated in
/// the function sheet's own `(0, 0)` — there is no calling cell to inherit
/// `$` from.
pub fn evaluate_function(
    ctx: &mut Context,
    function_sheet: SheetHandle,
    args: &[&[u8]],
) -> CellValue {
    let (params, output, already_calling) = match ctx.sheet(function_sheet) {
        Some(s) => (s.function_params.clone(), s.function_output, s.is_calling()),
        None => return CellValue::Error(CalcError::new(ErrorKind::Reference)),
    };
    if args.len() != params.len() {
        return CellValue::Error(CalcError::new(ErrorKind::Arity));
    }
    let output = match output {
        Some(pos) => pos,
        None => return CellValue::Error(CalcError::new(ErrorKind::Reference)),
    };
    if already_calling {
        return CellValue::Error(CalcError::new(ErrorKind::Resource));
    }

    let mut values = Vec::with_capacity(args.len());
    for &text in args {
        let parsed = sheetcalc_parse::parse(text, ctx.atoms_mut(), &*crate::function::BUILTINS);
        let mut tree = crate::arena::clone_for_eval(&parsed.arena);
        let result_id = interpreter::eval_expr(ctx, &mut tree, function_sheet, 0, 0, parsed.root);
        values.push(interpreter::extract_cell_value(&tree, result_id));
    }

    if let Some(t) = ctx.sheet_mut(function_sheet) {
        for (slot, (pos, value)) in t.arg_slots.iter_mut().zip(params.iter().zip(values)) {
            *slot = Some((*pos, value));
        }
    }

    let result = interpreter::evaluate_cell(ctx, function_sheet, output.0, output.1);

    if let Some(t) = ctx.sheet_mut(function_sheet) {
        for slot in t.arg_slots.iter_mut() {
            *slot = None;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullSink;

    fn new_ctx() -> Context {
        Context::new(Box::new(NullSink))
    }

    #[test]
    fn evaluate_string_evaluates_in_isolation_from_any_cell() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"sheet1");
        ctx.ensure_sheet(SheetHandle(0), name);
        let value = evaluate_string(&mut ctx, SheetHandle(0), b"1+2*3", 0, 0);
        assert_eq!(value, CellValue::Number(7.0));
    }

    #[test]
    fn evaluate_formulas_counts_errors_and_is_idempotent() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"sheet1");
        ctx.ensure_sheet(SheetHandle(0), name);
        let bad = ctx.atoms_mut().intern(b"=a$");
        ctx.sheet_mut(SheetHandle(0)).unwrap().set_cell(0, 0, bad);
        let first = evaluate_formulas(&mut ctx);
        let second = evaluate_formulas(&mut ctx);
        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }

    #[test]
    fn evaluate_function_binds_args_and_reads_the_output_cell() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"adder");
        let handle = SheetHandle(0);
        {
            let sheet = ctx.ensure_sheet(handle, name);
            sheet.flags = crate::sheet::SheetFlags::IS_FUNCTION;
            sheet.function_params = smallvec::smallvec![(0, 0), (0, 1)];
            sheet.function_output = Some((0, 2));
        }
        let formula = ctx.atoms_mut().intern(b"=a1+b1");
        ctx.sheet_mut(handle).unwrap().set_cell(0, 2, formula);
        let five = b"5";
        let six = b"6";
        let result = evaluate_function(&mut ctx, handle, &[five, six]);
        assert_eq!(result, CellValue::Number(11.0));
    }
}

//! End-to-end scenarios built straight from whole sheets rather than single
//! expressions, exercising `evaluate_formulas` the way a host actually
//! drives the engine.

use sheetcalc_eval::{CellValue, Context, NullSink, SheetHandle};
use sheetcalc_common::CachedResult;

fn new_ctx() -> Context {
    Context::new(Box::new(NullSink))
}

fn number_at(ctx: &Context, sheet: SheetHandle, row: i32, col: i32) -> f64 {
    match ctx.sheet(sheet).unwrap().results.get(&(row, col)) {
        Some(CachedResult::Number(n)) => *n,
        other => panic!("expected a cached number at ({row},{col}), got {other:?}"),
    }
}

fn string_at<'a>(ctx: &'a Context, sheet: SheetHandle, row: i32, col: i32) -> &'a str {
    match ctx.sheet(sheet).unwrap().results.get(&(row, col)) {
        Some(CachedResult::String(a)) => ctx.atom_get_str(*a),
        other => panic!("expected a cached string at ({row},{col}), got {other:?}"),
    }
}

/// Scenario 1 (spec §8): an item table with `sum`, `find`, `tlu`, and a
/// windowed `min` over the same three columns.
#[test]
fn item_table_sum_find_tlu_and_windowed_min() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");

    let rows: &[(&[u8], &[u8], &[u8])] = &[
        (b"=sum(c)", b"Axe", b"10"),
        (b"=find('Food', b)", b"Torch", b"1"),
        (b"=tlu('Plate Armor', b, c)", b"Plate Armor", b"50"),
        (b"=min(c:2)", b"Food", b"1 per potato"),
    ];
    for (row, (a, b, c)) in rows.iter().enumerate() {
        ctx.set_cell_str(sheet, row as i32, 0, a);
        ctx.set_cell_str(sheet, row as i32, 1, b);
        ctx.set_cell_str(sheet, row as i32, 2, c);
    }

    let nerrs = ctx.evaluate_formulas();
    assert_eq!(nerrs, 0);

    assert_eq!(number_at(&ctx, sheet, 0, 0), 61.0);
    assert_eq!(number_at(&ctx, sheet, 1, 0), 4.0);
    assert_eq!(number_at(&ctx, sheet, 2, 0), 50.0);
    assert_eq!(number_at(&ctx, sheet, 3, 0), 1.0);
}

/// Scenario 2: the d20 ability-modifier table, `mod(3)` through `mod(20)`.
#[test]
fn mod_builtin_matches_the_d20_modifier_table() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");

    let expected = [
        -4.0, -3.0, -3.0, -2.0, -2.0, -1.0, -1.0, 0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0,
        4.0, 5.0,
    ];
    for (i, score) in (3..=20).enumerate() {
        let formula = format!("=mod({score})");
        ctx.set_cell_str(sheet, i as i32, 0, formula.as_bytes());
    }

    ctx.evaluate_formulas();

    for (i, want) in expected.iter().enumerate() {
        assert_eq!(number_at(&ctx, sheet, i as i32, 0), *want, "score {}", i + 3);
    }
}

/// Scenario 3: `if` truthiness over a number, an empty string, and a
/// non-empty string.
#[test]
fn if_truthiness_of_number_empty_string_and_nonempty_string() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");

    ctx.set_cell_str(sheet, 0, 0, b"=if(1,2,3)");
    ctx.set_cell_str(sheet, 1, 0, b"=if('',2,3)");
    ctx.set_cell_str(sheet, 2, 0, b"=if('a',2,3)");

    ctx.evaluate_formulas();

    assert_eq!(number_at(&ctx, sheet, 0, 0), 2.0);
    assert_eq!(number_at(&ctx, sheet, 1, 0), 3.0);
    assert_eq!(number_at(&ctx, sheet, 2, 0), 2.0);
}

/// Scenario 4: `cat` concatenates its arguments in order.
#[test]
fn cat_concatenates_in_argument_order() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");
    ctx.set_cell_str(sheet, 0, 0, b"=cat('a','b','c','d')");

    ctx.evaluate_formulas();

    assert_eq!(string_at(&ctx, sheet, 0, 0), "abcd");
}

/// Scenario 5: a foreign single-cell fetch and a foreign whole-column sum,
/// against a second sheet's column A = `[1; 2]`.
#[test]
fn foreign_range_fetch_and_whole_column_sum() {
    let mut ctx = new_ctx();
    let root = SheetHandle(0);
    let other = SheetHandle(1);
    ctx.set_sheet_name(root, b"root");
    ctx.set_sheet_name(other, b"other");

    ctx.set_cell_str(other, 0, 0, b"1");
    ctx.set_cell_str(other, 1, 0, b"2");

    ctx.set_cell_str(root, 0, 0, b"=sum([other, a])");
    ctx.set_cell_str(root, 1, 0, b"=sum([other, a, 2])");

    ctx.evaluate_formulas();

    assert_eq!(number_at(&ctx, root, 0, 0), 3.0);
    assert_eq!(number_at(&ctx, root, 1, 0), 2.0);
}

/// Scenario 6: `tlu` never confuses the text atom `'4'` with the number `4`.
#[test]
fn tlu_distinguishes_the_text_atom_four_from_the_number_four() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");
    ctx.set_cell_str(
        sheet,
        0,
        0,
        b"=tlu(4, array(2, '4', 4, 6), array(7, 8, 9, 10))",
    );

    ctx.evaluate_formulas();

    assert_eq!(number_at(&ctx, sheet, 0, 0), 9.0);
}

/// Testable property 5: `$` substitutes the calling cell's own row.
#[test]
fn dollar_resolves_to_the_calling_cells_own_row() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");
    ctx.set_cell_str(sheet, 2, 1, b"9");
    ctx.set_cell_str(sheet, 2, 0, b"=b$");

    ctx.evaluate_formulas();

    assert_eq!(number_at(&ctx, sheet, 2, 0), 9.0);
}

/// Testable property 6: mutual self-reference is an error on both cells,
/// not a crash.
#[test]
fn mutual_self_reference_errors_both_cells_without_crashing() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");
    ctx.set_cell_str(sheet, 0, 0, b"=a2");
    ctx.set_cell_str(sheet, 1, 0, b"=a1");

    let nerrs = ctx.evaluate_formulas();

    assert_eq!(nerrs, 2);
    assert!(ctx.sheet(sheet).unwrap().results.get(&(0, 0)).is_none());
    assert!(ctx.sheet(sheet).unwrap().results.get(&(1, 0)).is_none());
}

/// Testable property 7: mismatched array lengths are a shape error; equal
/// lengths broadcast element-wise.
#[test]
fn broadcast_shape_rules_for_binary_arithmetic() {
    let mut ctx = new_ctx();
    let sheet = SheetHandle(0);
    ctx.set_sheet_name(sheet, b"root");

    let mismatched = ctx.evaluate_string(sheet, b"=array(1,2)+array(1,2,3)", 0, 0);
    assert!(matches!(mismatched, CellValue::Error(_)));

    let ok = ctx.evaluate_string(sheet, b"=array(1,2)+array(10,20)", 0, 0);
    assert_eq!(
        ok,
        CellValue::Array(vec![CellValue::Number(11.0), CellValue::Number(22.0)])
    );
}

/// A user-defined function sheet called through `evaluate_function`,
/// exercising the same path a host uses for ad-hoc calls outside the grid.
#[test]
fn user_defined_function_sheet_computes_from_bound_arguments() {
    let mut ctx = new_ctx();
    let adder = SheetHandle(0);
    ctx.set_sheet_name(adder, b"adder");
    ctx.set_sheet_flag(adder, sheetcalc_eval::SheetFlags::IS_FUNCTION, true);
    ctx.set_function_params(adder, &[(0, 0), (0, 1)]).unwrap();
    ctx.set_function_output(adder, 0, 2);
    ctx.set_cell_str(adder, 0, 2, b"=a1+b1");

    let result = ctx.evaluate_function(adder, &[b"4", b"5"]);

    assert_eq!(result, CellValue::Number(9.0));
}

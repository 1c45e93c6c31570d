//! The two-layer evaluator core.
//!
//! `evaluate_cell` is the cross-cell-boundary entry (§4.5 "Entry. evaluate
//! (sheet, row, col)"): it owns the recursion-depth guard, the
//! arg-slot/cache/parse-cache lookups, and returns an owned `CellValue` that
//! has outlived whatever scratch tree produced it. `eval_expr` is the
//! intra-tree recursion: it walks nodes of a single cloned working
//! `ParseArena` and returns a `NodeId` back into that same tree, mutating
//! numeric nodes and appending new ones as spec.md §4.2/§4.4 describe.
//! Crossing from one cell's tree into another's happens only by calling
//! `evaluate_cell` again and re-materializing its result with
//! `push_cell_value` — never by handing out a `NodeId` from a foreign tree.

use sheetcalc_common::{Atom, CachedResult, CalcError, ErrorKind};
use sheetcalc_parse::{BinOp, Expr, NodeId, ParseArena, UnOp};

use crate::context::{Context, DEPTH_LIMIT};
use crate::function::{Call, BUILTINS};
use crate::reference;
use crate::sheet::SheetHandle;

/// An owned, arena-independent snapshot of a cell's computed value — the
/// Rust stand-in for spec.md §4.5's "the scalar is copied out of the
/// scratch arena ... so the caller can consume it after the inner arena is
/// reclaimed". Also the type bound into a function sheet's argument slots.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Blank,
    Number(f64),
    Text(Atom),
    Error(CalcError),
    /// Elements are always one of the scalar variants above, never another
    /// `Array` — mirrors `Expr::ComputedArray`'s invariant.
    Array(Vec<CellValue>),
}

impl CellValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Blank => false,
            CellValue::Number(n) => *n != 0.0,
            CellValue::Text(a) => !a.is_nil(),
            CellValue::Error(_) => false,
            CellValue::Array(_) => false,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CellValue::Array(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellValue::Error(_))
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn push(tree: &mut ParseArena, expr: Expr) -> NodeId {
    tree.push(expr)
}

fn push_error(tree: &mut ParseArena, kind: ErrorKind) -> NodeId {
    push(tree, Expr::Error(CalcError::new(kind)))
}

/// Materialize an owned `CellValue` as nodes in `tree`, the inverse of
/// `extract_cell_value`.
pub fn push_cell_value(tree: &mut ParseArena, value: &CellValue) -> NodeId {
    match value {
        CellValue::Blank => push(tree, Expr::Blank),
        CellValue::Number(n) => push(tree, Expr::Number(*n)),
        CellValue::Text(a) => push(tree, Expr::String(*a)),
        CellValue::Error(e) => push(tree, Expr::Error(*e)),
        CellValue::Array(items) => {
            let data = items.iter().map(|v| push_cell_value(tree, v)).collect();
            push(tree, Expr::ComputedArray { data })
        }
    }
}

/// Snapshot an already-evaluated node into an owned `CellValue`. `id` must
/// name a fully reduced node (`Blank`/`Number`/`String`/`Error`/
/// `ComputedArray` of the same); anything else indicates a bug in the
/// caller and is reported as a type error rather than panicking.
pub fn extract_cell_value(tree: &ParseArena, id: NodeId) -> CellValue {
    match tree.get(id) {
        Expr::Blank => CellValue::Blank,
        Expr::Number(n) => CellValue::Number(*n),
        Expr::String(a) => CellValue::Text(*a),
        Expr::Error(e) => CellValue::Error(*e),
        Expr::ComputedArray { data } => {
            CellValue::Array(data.iter().map(|&n| extract_cell_value(tree, n)).collect())
        }
        _ => CellValue::Error(CalcError::new(ErrorKind::Type)),
    }
}

fn cached_result_to_value(cr: CachedResult) -> CellValue {
    match cr {
        CachedResult::Null => CellValue::Blank,
        CachedResult::Number(n) => CellValue::Number(n),
        CachedResult::String(a) => CellValue::Text(a),
        CachedResult::Error(e) => CellValue::Error(e),
    }
}

/// Only non-error, non-array results are ever written to a sheet's result
/// cache (§7, §4.5).
fn value_to_cached_result(value: &CellValue) -> Option<CachedResult> {
    match value {
        CellValue::Blank => Some(CachedResult::Null),
        CellValue::Number(n) => Some(CachedResult::Number(*n)),
        CellValue::Text(a) => Some(CachedResult::String(*a)),
        CellValue::Error(_) | CellValue::Array(_) => None,
    }
}

/// The driver's per-cell display form (§4.7): every variant collapses to
/// one of `{null, number, string, error}`. An array result displays as its
/// first element (recursively), the way a spreadsheet shows a spilled
/// range's corner value in the anchor cell; an empty array displays blank.
/// This is a Rust-port decision not pinned by spec.md — see DESIGN.md.
pub fn to_display(value: &CellValue) -> CachedResult {
    match value {
        CellValue::Blank => CachedResult::Null,
        CellValue::Number(n) => CachedResult::Number(*n),
        CellValue::Text(a) => CachedResult::String(*a),
        CellValue::Error(e) => CachedResult::Error(*e),
        CellValue::Array(items) => items.first().map(to_display).unwrap_or(CachedResult::Null),
    }
}

fn parse_leading_number(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.trim().parse::<f64>().ok()
}

fn resolve_target_sheet(
    ctx: &Context,
    caller: SheetHandle,
    foreign: Option<Atom>,
) -> Result<SheetHandle, ErrorKind> {
    match foreign {
        None => Ok(caller),
        Some(name) => ctx.find_sheet(name).ok_or(ErrorKind::Reference),
    }
}

/// The cross-cell-boundary entry point: spec.md §4.5's `evaluate(sheet,
/// row, col)`. Owns the recursion guard.
pub fn evaluate_cell(ctx: &mut Context, sheet: SheetHandle, row: i32, col: i32) -> CellValue {
    let depth = ctx.depth.get();
    if depth >= DEPTH_LIMIT {
        return CellValue::Error(CalcError::new(ErrorKind::Resource));
    }
    ctx.depth.set(depth + 1);
    let result = evaluate_cell_inner(ctx, sheet, row, col);
    ctx.depth.set(ctx.depth.get() - 1);
    result
}

fn evaluate_cell_inner(ctx: &mut Context, sheet: SheetHandle, row: i32, col: i32) -> CellValue {
    let atom = match ctx.sheets.get(&sheet) {
        Some(sheet_ref) => {
            for slot in sheet_ref.arg_slots.iter() {
                if let Some((pos, value)) = slot {
                    if *pos == (row, col) {
                        return value.clone();
                    }
                }
            }
            sheet_ref.get_cell(row, col)
        }
        None => return CellValue::Error(CalcError::new(ErrorKind::Reference)),
    };

    if atom.is_nil() {
        return CellValue::Blank;
    }
    let bytes = ctx.atoms().get(atom).to_vec();
    match bytes.first() {
        Some(b'=') => evaluate_formula_cell(ctx, sheet, row, col, atom, &bytes),
        Some(b'-') | Some(b'.') | Some(b'0'..=b'9') => match parse_leading_number(&bytes) {
            Some(n) => CellValue::Number(n),
            None => CellValue::Text(atom),
        },
        _ => CellValue::Text(atom),
    }
}

fn evaluate_formula_cell(
    ctx: &mut Context,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    atom: Atom,
    bytes: &[u8],
) -> CellValue {
    if let Some(cached) = ctx.sheets[&sheet].results.get(&(row, col)) {
        return cached_result_to_value(*cached);
    }

    let parsed = match ctx.parse_cache.get(&atom) {
        Some(p) => p.clone(),
        None => {
            let p = sheetcalc_parse::parse(bytes, &mut ctx.atoms, &*BUILTINS);
            ctx.parse_cache.insert(atom, p.clone());
            p
        }
    };

    let mut tree = crate::arena::clone_for_eval(&parsed.arena);
    let result_id = eval_expr(ctx, &mut tree, sheet, row, col, parsed.root);
    let value = extract_cell_value(&tree, result_id);

    if let Some(cr) = value_to_cached_result(&value) {
        if let Some(sheet_mut) = ctx.sheets.get_mut(&sheet) {
            sheet_mut.results.insert((row, col), cr);
        }
    }
    value
}

/// The intra-tree recursion: spec.md's `evaluate` as it walks one already
/// fetched expression, without crossing into another cell's tree except via
/// `evaluate_cell`.
pub fn eval_expr(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    id: NodeId,
) -> NodeId {
    let expr = tree.get(id).clone();
    match expr {
        Expr::Error(_)
        | Expr::Blank
        | Expr::Number(_)
        | Expr::String(_)
        | Expr::ComputedArray { .. } => id,

        Expr::Group { expr } => eval_expr(ctx, tree, sheet, row, col, expr),

        Expr::Unary { op, expr } => eval_unary(ctx, tree, sheet, row, col, op, expr),
        Expr::Binary { op, lhs, rhs } => eval_binary(ctx, tree, sheet, row, col, op, lhs, rhs),

        Expr::Range0D { col_name, row: r } => {
            eval_range0d(ctx, tree, sheet, row, col, None, col_name, r)
        }
        Expr::ForeignRange0D {
            sheet: fs,
            col_name,
            row: r,
        } => eval_range0d(ctx, tree, sheet, row, col, Some(fs), col_name, r),

        Expr::Range1DColumn {
            col_name,
            row_start,
            row_end,
        } => eval_range1d_col(ctx, tree, sheet, row, col, None, col_name, row_start, row_end),
        Expr::ForeignRange1DColumn {
            sheet: fs,
            col_name,
            row_start,
            row_end,
        } => eval_range1d_col(
            ctx,
            tree,
            sheet,
            row,
            col,
            Some(fs),
            col_name,
            row_start,
            row_end,
        ),

        Expr::Range1DRow {
            col_start,
            col_end,
            row: r,
        } => eval_range1d_row(ctx, tree, sheet, row, col, None, col_start, col_end, r),
        Expr::ForeignRange1DRow {
            sheet: fs,
            col_start,
            col_end,
            row: r,
        } => eval_range1d_row(ctx, tree, sheet, row, col, Some(fs), col_start, col_end, r),

        Expr::FunctionCall { builtin, argv } => {
            let mut call = Call {
                ctx,
                tree,
                sheet,
                row,
                col,
            };
            BUILTINS.call(builtin, &mut call, &argv)
        }
        Expr::UserFunctionCall { name, argv } => {
            eval_user_call(ctx, tree, sheet, row, col, name, &argv)
        }
    }
}

fn as_array(tree: &ParseArena, id: NodeId) -> Option<Vec<NodeId>> {
    match tree.get(id) {
        Expr::ComputedArray { data } => Some(data.clone()),
        _ => None,
    }
}

fn apply_unary_scalar(tree: &mut ParseArena, op: UnOp, id: NodeId) -> NodeId {
    match tree.get(id).clone() {
        Expr::Error(e) => push(tree, Expr::Error(e)),
        Expr::Blank => push(tree, Expr::Blank),
        Expr::Number(n) => match op {
            UnOp::Neg => push(tree, Expr::Number(-n)),
            UnOp::Not => push(tree, Expr::Number(bool_num(n == 0.0))),
            UnOp::Plus => push(tree, Expr::Number(n)),
        },
        _ => push_error(tree, ErrorKind::Type),
    }
}

fn eval_unary(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    op: UnOp,
    expr: NodeId,
) -> NodeId {
    let id = eval_expr(ctx, tree, sheet, row, col, expr);
    if let Some(data) = as_array(tree, id) {
        let mapped: Vec<NodeId> = data.iter().map(|&n| apply_unary_scalar(tree, op, n)).collect();
        return push(tree, Expr::ComputedArray { data: mapped });
    }
    apply_unary_scalar(tree, op, id)
}

fn numeric_binary(op: BinOp, x: f64, y: f64) -> Expr {
    match op {
        BinOp::Add => Expr::Number(x + y),
        BinOp::Sub => Expr::Number(x - y),
        BinOp::Mul => Expr::Number(x * y),
        BinOp::Div => {
            if y == 0.0 {
                Expr::Error(CalcError::new(ErrorKind::Domain))
            } else {
                Expr::Number(x / y)
            }
        }
        BinOp::Lt => Expr::Number(bool_num(x < y)),
        BinOp::Le => Expr::Number(bool_num(x <= y)),
        BinOp::Gt => Expr::Number(bool_num(x > y)),
        BinOp::Ge => Expr::Number(bool_num(x >= y)),
        BinOp::Eq => Expr::Number(bool_num(x == y)),
        BinOp::Ne => Expr::Number(bool_num(x != y)),
    }
}

/// Applies `op` to two already-evaluated scalar nodes. Blank short-circuits
/// to Blank (extended to comparisons too — see DESIGN.md's Open Question
/// ledger); errors propagate; `=`/`!=` are the only comparisons strings
/// support (atom identity), everything else on strings is a type error.
fn apply_binary_scalar(tree: &mut ParseArena, op: BinOp, a: NodeId, b: NodeId) -> NodeId {
    let ea = tree.get(a).clone();
    let eb = tree.get(b).clone();
    if let Expr::Error(e) = ea {
        return push(tree, Expr::Error(e));
    }
    if let Expr::Error(e) = eb {
        return push(tree, Expr::Error(e));
    }
    if matches!(ea, Expr::Blank) || matches!(eb, Expr::Blank) {
        return push(tree, Expr::Blank);
    }
    match (ea, eb) {
        (Expr::Number(x), Expr::Number(y)) => {
            let result = numeric_binary(op, x, y);
            push(tree, result)
        }
        (Expr::String(x), Expr::String(y)) => match op {
            BinOp::Eq => push(tree, Expr::Number(bool_num(x == y))),
            BinOp::Ne => push(tree, Expr::Number(bool_num(x != y))),
            _ => push_error(tree, ErrorKind::Type),
        },
        _ => push_error(tree, ErrorKind::Type),
    }
}

/// Scalar/array broadcasting (§4.5's table): arrays of equal length combine
/// element-wise; a scalar paired with an array is replicated over every
/// element regardless of which side it's on, which already reproduces the
/// "swap for commutative ops" behavior as a side effect of always keeping
/// each element's position (property 8).
fn apply_binary(tree: &mut ParseArena, op: BinOp, lhs: NodeId, rhs: NodeId) -> NodeId {
    let lhs_arr = as_array(tree, lhs);
    let rhs_arr = as_array(tree, rhs);
    match (lhs_arr, rhs_arr) {
        (Some(l), Some(r)) => {
            if l.len() != r.len() {
                return push_error(tree, ErrorKind::Shape);
            }
            let data: Vec<NodeId> = l
                .iter()
                .zip(r.iter())
                .map(|(&a, &b)| apply_binary_scalar(tree, op, a, b))
                .collect();
            push(tree, Expr::ComputedArray { data })
        }
        (Some(l), None) => {
            let data: Vec<NodeId> = l.iter().map(|&a| apply_binary_scalar(tree, op, a, rhs)).collect();
            push(tree, Expr::ComputedArray { data })
        }
        (None, Some(r)) => {
            let data: Vec<NodeId> = r.iter().map(|&b| apply_binary_scalar(tree, op, lhs, b)).collect();
            push(tree, Expr::ComputedArray { data })
        }
        (None, None) => apply_binary_scalar(tree, op, lhs, rhs),
    }
}

fn eval_binary(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    op: BinOp,
    lhs: NodeId,
    rhs: NodeId,
) -> NodeId {
    let lhs_id = eval_expr(ctx, tree, sheet, row, col, lhs);
    let rhs_id = eval_expr(ctx, tree, sheet, row, col, rhs);
    apply_binary(tree, op, lhs_id, rhs_id)
}

#[allow(clippy::too_many_arguments)]
fn eval_range0d(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    foreign: Option<Atom>,
    col_name: Atom,
    raw_row: i32,
) -> NodeId {
    let _ = col;
    let target = match resolve_target_sheet(ctx, sheet, foreign) {
        Ok(h) => h,
        Err(k) => return push_error(tree, k),
    };
    if foreign.is_some() {
        ctx.add_dependant(target, sheet);
    }
    let resolved = {
        let sheet_ref = match ctx.sheet(target) {
            Some(s) => s,
            None => return push_error(tree, ErrorKind::Reference),
        };
        match reference::resolve_col_name(sheet_ref, ctx.atoms(), col_name) {
            Some(c) => Some((reference::resolve_row(raw_row, row), c)),
            None => None,
        }
    };
    let (r, c) = match resolved {
        Some(pair) => pair,
        None => return push_error(tree, ErrorKind::Reference),
    };
    let value = evaluate_cell(ctx, target, r, c);
    push_cell_value(tree, &value)
}

#[allow(clippy::too_many_arguments)]
fn eval_range1d_col(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    foreign: Option<Atom>,
    col_name: Atom,
    row_start: i32,
    row_end: i32,
) -> NodeId {
    let _ = col;
    let target = match resolve_target_sheet(ctx, sheet, foreign) {
        Ok(h) => h,
        Err(k) => return push_error(tree, k),
    };
    if foreign.is_some() {
        ctx.add_dependant(target, sheet);
    }

    // A bare, unbounded column (`[c]`/`c`) first checks the named-cell map —
    // spec.md §4.5: "Range1DColumn whose row_start=0, row_end=-1 is also
    // examined against the sheet's named-cell map; a hit produces the named
    // cell's evaluation" directly, as a scalar rather than a full column.
    if row_start == 0 && row_end == -1 {
        let named = ctx.sheet(target).and_then(|s| s.lookup_named_cell(col_name));
        if let Some((nr, nc)) = named {
            let value = evaluate_cell(ctx, target, nr, nc);
            return push_cell_value(tree, &value);
        }
    }

    let span = {
        let sheet_ref = match ctx.sheet(target) {
            Some(s) => s,
            None => return push_error(tree, ErrorKind::Reference),
        };
        match reference::resolve_col_name(sheet_ref, ctx.atoms(), col_name) {
            Some(c) => {
                let start = reference::resolve_row(row_start, row);
                let end = reference::resolve_row(row_end, row);
                let (s, e) = reference::resolve_span(start, end, sheet_ref.height);
                Some((c, s, e))
            }
            None => None,
        }
    };
    let (c, s, e) = match span {
        Some(v) => v,
        None => return push_error(tree, ErrorKind::Reference),
    };

    let mut data = Vec::new();
    for r in s..=e {
        let value = evaluate_cell(ctx, target, r, c);
        data.push(push_cell_value(tree, &value));
    }
    push(tree, Expr::ComputedArray { data })
}

#[allow(clippy::too_many_arguments)]
fn eval_range1d_row(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    foreign: Option<Atom>,
    col_start: Atom,
    col_end: Atom,
    raw_row: i32,
) -> NodeId {
    let _ = col;
    let target = match resolve_target_sheet(ctx, sheet, foreign) {
        Ok(h) => h,
        Err(k) => return push_error(tree, k),
    };
    if foreign.is_some() {
        ctx.add_dependant(target, sheet);
    }
    let resolved = {
        let sheet_ref = match ctx.sheet(target) {
            Some(s) => s,
            None => return push_error(tree, ErrorKind::Reference),
        };
        let start = reference::resolve_col_name(sheet_ref, ctx.atoms(), col_start);
        let end = reference::resolve_col_name(sheet_ref, ctx.atoms(), col_end);
        match (start, end) {
            (Some(s), Some(e)) => Some((s, e)),
            _ => None,
        }
    };
    let (c_start, c_end) = match resolved {
        Some(v) => v,
        None => return push_error(tree, ErrorKind::Reference),
    };
    let r = reference::resolve_row(raw_row, row);

    let mut data = Vec::new();
    if c_start <= c_end {
        for c in c_start..=c_end {
            let value = evaluate_cell(ctx, target, r, c);
            data.push(push_cell_value(tree, &value));
        }
    }
    push(tree, Expr::ComputedArray { data })
}

fn eval_user_call(
    ctx: &mut Context,
    tree: &mut ParseArena,
    sheet: SheetHandle,
    row: i32,
    col: i32,
    name: Atom,
    argv: &[NodeId],
) -> NodeId {
    let target = match ctx.find_function_sheet(name) {
        Some(h) => h,
        None => return push_error(tree, ErrorKind::Reference),
    };
    let (params, output, already_calling) = {
        let t = &ctx.sheets[&target];
        (t.function_params.clone(), t.function_output, t.is_calling())
    };
    if argv.len() != params.len() {
        return push_error(tree, ErrorKind::Arity);
    }
    let output = match output {
        Some(pos) => pos,
        None => return push_error(tree, ErrorKind::Reference),
    };
    if already_calling {
        return push_error(tree, ErrorKind::Resource);
    }

    let mut values = Vec::with_capacity(argv.len());
    for &arg_id in argv.iter() {
        let evaluated = eval_expr(ctx, tree, sheet, row, col, arg_id);
        values.push(extract_cell_value(tree, evaluated));
    }

    if let Some(t) = ctx.sheets.get_mut(&target) {
        for (slot, (pos, value)) in t.arg_slots.iter_mut().zip(params.iter().zip(values)) {
            *slot = Some((*pos, value));
        }
    }

    let result = evaluate_cell(ctx, target, output.0, output.1);

    if let Some(t) = ctx.sheets.get_mut(&target) {
        for slot in t.arg_slots.iter_mut() {
            *slot = None;
        }
    }

    push_cell_value(tree, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullSink;

    fn new_ctx() -> Context {
        Context::new(Box::new(NullSink))
    }

    #[test]
    fn a_blank_cell_evaluates_to_blank() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"sheet1");
        ctx.ensure_sheet(SheetHandle(0), name);
        let value = evaluate_cell(&mut ctx, SheetHandle(0), 0, 0);
        assert_eq!(value, CellValue::Blank);
    }

    #[test]
    fn a_numeric_literal_cell_evaluates_to_a_number() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"sheet1");
        ctx.ensure_sheet(SheetHandle(0), name);
        let seven = ctx.atoms_mut().intern(b"7");
        ctx.sheets.get_mut(&SheetHandle(0)).unwrap().set_cell(0, 0, seven);
        let value = evaluate_cell(&mut ctx, SheetHandle(0), 0, 0);
        assert_eq!(value, CellValue::Number(7.0));
    }

    #[test]
    fn a1_formula_reads_the_referenced_cell() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"sheet1");
        ctx.ensure_sheet(SheetHandle(0), name);
        let seven = ctx.atoms_mut().intern(b"7");
        let formula = ctx.atoms_mut().intern(b"=a1");
        {
            let sheet = ctx.sheets.get_mut(&SheetHandle(0)).unwrap();
            sheet.set_cell(0, 0, seven);
            sheet.set_cell(0, 1, formula);
        }
        let value = evaluate_cell(&mut ctx, SheetHandle(0), 0, 1);
        assert_eq!(value, CellValue::Number(7.0));
    }

    #[test]
    fn self_reference_via_dollar_is_an_error_not_a_crash() {
        let mut ctx = new_ctx();
        let name = ctx.atoms_mut().intern_lower(b"sheet1");
        ctx.ensure_sheet(SheetHandle(0), name);
        let formula = ctx.atoms_mut().intern(b"=a$");
        ctx.sheets.get_mut(&SheetHandle(0)).unwrap().set_cell(0, 0, formula);
        let value = evaluate_cell(&mut ctx, SheetHandle(0), 0, 0);
        assert!(matches!(value, CellValue::Error(_)));
    }

    #[test]
    fn scalar_plus_array_broadcasts_preserving_element_order() {
        let mut tree = ParseArena::new();
        let one = tree.push(Expr::Number(1.0));
        let two = tree.push(Expr::Number(2.0));
        let arr = tree.push(Expr::ComputedArray { data: vec![one, two] });
        let scalar = tree.push(Expr::Number(10.0));
        let sum = apply_binary(&mut tree, BinOp::Add, scalar, arr);
        match tree.get(sum) {
            Expr::ComputedArray { data } => {
                assert_eq!(data.len(), 2);
                assert!(matches!(tree.get(data[0]), Expr::Number(n) if *n == 11.0));
                assert!(matches!(tree.get(data[1]), Expr::Number(n) if *n == 12.0));
            }
            other => panic!("expected ComputedArray, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_array_lengths_are_a_shape_error() {
        let mut tree = ParseArena::new();
        let one = tree.push(Expr::Number(1.0));
        let a = tree.push(Expr::ComputedArray { data: vec![one] });
        let two = tree.push(Expr::Number(2.0));
        let three = tree.push(Expr::Number(3.0));
        let b = tree.push(Expr::ComputedArray { data: vec![two, three] });
        let result = apply_binary(&mut tree, BinOp::Add, a, b);
        match tree.get(result) {
            Expr::Error(e) => assert_eq!(e.kind, ErrorKind::Shape),
            other => panic!("expected Error(Shape), got {other:?}"),
        }
    }

    #[test]
    fn extract_then_push_round_trips_a_blank() {
        let mut tree = ParseArena::new();
        let id = tree.push(Expr::Blank);
        let value = extract_cell_value(&tree, id);
        assert_eq!(value, CellValue::Blank);
        let id2 = push_cell_value(&mut tree, &value);
        assert!(matches!(tree.get(id2), Expr::Blank));
    }

    #[test]
    fn blank_short_circuits_arithmetic() {
        let mut tree = ParseArena::new();
        let blank = tree.push(Expr::Blank);
        let number = tree.push(Expr::Number(5.0));
        let result = apply_binary_scalar(&mut tree, BinOp::Add, blank, number);
        assert!(matches!(tree.get(result), Expr::Blank));
    }
}

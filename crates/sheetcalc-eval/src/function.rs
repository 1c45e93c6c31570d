//! The built-in function table: bucketed by name length, then linear-scanned
//! within the bucket, exactly matching `drspread_formula_funcs.c`'s
//! `FUNC1`/`FUNC2`/`FUNC3`/`FUNC4` arrays (see SPEC_FULL.md §9). Built once
//! via `once_cell::sync::Lazy`, the way the teacher's `function_registry`
//! builds its (concurrent) table once — ours is a plain `Lazy` rather than
//! a `DashMap` because the context is single-threaded (§5).

use crate::context::Context;
use crate::interpreter::CellValue;
use crate::sheet::SheetHandle;
use crate::{builtins, interpreter};
use once_cell::sync::Lazy;
use sheetcalc_common::{CalcError, ErrorKind};
use sheetcalc_parse::{BuiltinId, BuiltinResolver, Expr, NodeId, ParseArena};

/// Everything one built-in needs: the context, the working tree it should
/// push result/error nodes into, and the calling cell's position (for `$`
/// and for anything that re-enters `evaluate`).
pub struct Call<'c, 't> {
    pub ctx: &'c mut Context,
    pub tree: &'t mut ParseArena,
    pub sheet: SheetHandle,
    pub row: i32,
    pub col: i32,
}

impl<'c, 't> Call<'c, 't> {
    /// Evaluate an argument's expression node in this call's context.
    pub fn eval(&mut self, id: NodeId) -> NodeId {
        interpreter::eval_expr(self.ctx, self.tree, self.sheet, self.row, self.col, id)
    }

    /// Evaluate an argument and snapshot it to an owned `CellValue` — the
    /// shape every built-in actually wants to pattern-match on.
    pub fn value(&mut self, id: NodeId) -> CellValue {
        let evaluated = self.eval(id);
        interpreter::extract_cell_value(self.tree, evaluated)
    }

    /// Materialize an owned `CellValue` back into this call's working tree.
    pub fn push_value(&mut self, value: &CellValue) -> NodeId {
        interpreter::push_cell_value(self.tree, value)
    }

    pub fn push(&mut self, expr: Expr) -> NodeId {
        self.tree.push(expr)
    }

    pub fn number(&mut self, n: f64) -> NodeId {
        self.push(Expr::Number(n))
    }

    pub fn error(&mut self, kind: ErrorKind) -> NodeId {
        self.push(Expr::Error(CalcError::new(kind)))
    }

    /// Re-push an error value already carried by an evaluated argument
    /// (propagation), rather than minting a fresh one.
    pub fn error_with(&mut self, err: CalcError) -> NodeId {
        self.push(Expr::Error(err))
    }

    pub fn blank(&mut self) -> NodeId {
        self.push(Expr::Blank)
    }
}

pub type BuiltinFn = fn(&mut Call, argv: &[NodeId]) -> NodeId;

/// A bucketed, length-indexed table of built-ins. `buckets[len]` holds
/// every built-in whose name is `len` bytes long.
pub struct BuiltinTable {
    flat: Vec<BuiltinFn>,
    buckets: Vec<Vec<(&'static str, u16)>>,
}

impl BuiltinTable {
    fn build() -> Self {
        let defs: &[(&str, BuiltinFn)] = &[
            ("sum", builtins::math::sum),
            ("avg", builtins::math::avg),
            ("min", builtins::math::min),
            ("max", builtins::math::max),
            ("count", builtins::math::count),
            ("prod", builtins::math::prod),
            ("mod", builtins::math::modifier),
            ("abs", builtins::math::abs),
            ("floor", builtins::math::floor),
            ("ceil", builtins::math::ceil),
            ("trunc", builtins::math::trunc),
            ("round", builtins::math::round),
            ("sqrt", builtins::math::sqrt),
            ("log", builtins::math::log),
            ("pow", builtins::math::pow),
            ("num", builtins::math::num),
            ("try", builtins::logical::try_fn),
            ("if", builtins::logical::if_fn),
            ("cat", builtins::text::cat),
            ("tlu", builtins::lookup::tlu),
            ("find", builtins::lookup::find),
            ("cell", builtins::reference_fns::cell),
            ("col", builtins::reference_fns::col),
            ("row", builtins::reference_fns::row),
            ("eval", builtins::reference_fns::eval),
            ("call", builtins::reference_fns::call),
            ("array", builtins::reference_fns::array),
        ];

        let mut flat = Vec::with_capacity(defs.len());
        let mut buckets: Vec<Vec<(&'static str, u16)>> = Vec::new();
        for &(name, f) in defs {
            let idx = flat.len() as u16;
            flat.push(f);
            let len = name.len();
            if buckets.len() <= len {
                buckets.resize_with(len + 1, Vec::new);
            }
            buckets[len].push((name, idx));
        }
        BuiltinTable { flat, buckets }
    }

    pub fn lookup(&self, name: &str) -> Option<BuiltinId> {
        self.buckets
            .get(name.len())?
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, idx)| BuiltinId(idx))
    }

    pub fn name_of(&self, id: BuiltinId) -> Option<&'static str> {
        self.buckets
            .iter()
            .flatten()
            .find(|(_, idx)| *idx == id.0)
            .map(|&(n, _)| n)
    }

    pub fn call(&self, id: BuiltinId, call: &mut Call, argv: &[NodeId]) -> NodeId {
        match self.flat.get(id.0 as usize) {
            Some(f) => f(call, argv),
            None => call.error(ErrorKind::Reference),
        }
    }
}

impl BuiltinResolver for BuiltinTable {
    fn resolve(&self, name: &str) -> Option<BuiltinId> {
        self.lookup(name)
    }
}

pub static BUILTINS: Lazy<BuiltinTable> = Lazy::new(BuiltinTable::build);

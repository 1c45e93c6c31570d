//! The expression tree: an index-based arena (`Vec<Expr>` + `NodeId`)
//! instead of the teacher's pointer-based tree, per the Rust-target mapping
//! in SPEC_FULL.md §3.

use sheetcalc_common::{Atom, CalcError};
use smallvec::SmallVec;

/// Inline capacity for a call's argument list — every call site in this
/// grammar takes at most four syntactic arguments.
pub type ArgList = SmallVec<[NodeId; 4]>;

/// An index into a `ParseArena`. Two `NodeId`s are equal iff they index the
/// same arena slot; they carry no meaning across different arenas.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub u32);

/// A built-in function, resolved to its bucket/slot at parse time (see
/// `BuiltinResolver`) rather than carried as a name.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BuiltinId(pub u16);

/// Classifies a call site as built-in or user-defined, decided once at
/// parse time by consulting a `BuiltinResolver` — see SPEC_FULL.md §4.4.
pub trait BuiltinResolver {
    /// `name` is already lowercased (it comes from `intern_lower`'d ident
    /// tokens); return the builtin's id if `name` names one.
    fn resolve(&self, name: &str) -> Option<BuiltinId>;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum UnOp {
    /// Numeric/boolean negation.
    Neg,
    /// Logical/numeric "not" (`!`).
    Not,
    /// The unary `+`. Never observed in a final tree — the folder at parse
    /// time always collapses a run of unary `+`/`-` down to at most one
    /// `Neg`/`Not` or none at all. Kept as a variant because the folder is
    /// implemented by building then collapsing, and intermediate states
    /// pass through it.
    Plus,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Error(CalcError),
    Blank,
    Number(f64),
    String(Atom),

    Range0D {
        col_name: Atom,
        row: i32,
    },
    ForeignRange0D {
        sheet: Atom,
        col_name: Atom,
        row: i32,
    },
    Range1DColumn {
        col_name: Atom,
        row_start: i32,
        row_end: i32,
    },
    ForeignRange1DColumn {
        sheet: Atom,
        col_name: Atom,
        row_start: i32,
        row_end: i32,
    },
    Range1DRow {
        col_start: Atom,
        col_end: Atom,
        row: i32,
    },
    ForeignRange1DRow {
        sheet: Atom,
        col_start: Atom,
        col_end: Atom,
        row: i32,
    },

    Binary {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
    },
    Unary {
        op: UnOp,
        expr: NodeId,
    },
    /// Parse-only grouping; never observed in evaluator output (the
    /// evaluator dereferences straight through it).
    Group {
        expr: NodeId,
    },

    FunctionCall {
        builtin: BuiltinId,
        argv: ArgList,
    },
    UserFunctionCall {
        name: Atom,
        argv: ArgList,
    },

    /// Produced only by the evaluator, never by the parser. Elements are
    /// always scalars (`Number`, `String`, `Blank`, or `Error`).
    ComputedArray {
        data: Vec<NodeId>,
    },
}

/// The long-lived tree storage for one parse-cache entry. Indexed by
/// `NodeId`; children reference each other by index rather than pointer.
#[derive(Default, Debug, Clone)]
pub struct ParseArena {
    nodes: Vec<Expr>,
}

impl ParseArena {
    pub fn new() -> Self {
        ParseArena { nodes: Vec::new() }
    }

    pub fn push(&mut self, expr: Expr) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(expr);
        id
    }

    pub fn get(&self, id: NodeId) -> &Expr {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Expr {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

//! The scratch working tree backing one top-level evaluation call.
//!
//! The working expression tree itself is a plain clone of the parse
//! cache's `ParseArena` (spec.md §4.4: "a parse cache hit produces a
//! clone… because the evaluator may mutate numeric nodes in place"); the
//! `NodeId` of the root after evaluation *is* the `Expression*` spec.md's
//! `evaluate` returns, so no separate result wrapper type is needed.
//! "Checkpoint" and "restore" (§4.2, §4.7) collapse to "clone a fresh tree
//! per top-level call and drop it when that call returns" — there is no
//! bump allocator here to reset, since every builtin that folds over a
//! range/array (`sum`, `cat`, `if`, `array`, broadcasting) accumulates into
//! a plain `Vec`, not an arena.

use sheetcalc_parse::{Expr, NodeId, ParseArena};

/// `evaluate`'s return value: an index into the caller-supplied working
/// `ParseArena`, not a pointer — see SPEC_FULL.md §3.
pub type EvalResult = NodeId;

/// Allocate a fresh working tree by cloning a parse-cache entry. The clone
/// is what the evaluator is free to mutate in place.
pub fn clone_for_eval(cached: &ParseArena) -> ParseArena {
    cached.clone()
}

/// Convenience used throughout the evaluator: push a fresh leaf node and
/// get its id back.
pub fn push(tree: &mut ParseArena, expr: Expr) -> NodeId {
    tree.push(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcalc_common::Atom;

    #[test]
    fn clone_for_eval_is_independent_of_the_cached_original() {
        let mut cached = ParseArena::new();
        cached.push(Expr::Number(1.0));
        let mut working = clone_for_eval(&cached);
        push(&mut working, Expr::String(Atom::NIL));
        assert_eq!(cached.len(), 1);
        assert_eq!(working.len(), 2);
    }
}

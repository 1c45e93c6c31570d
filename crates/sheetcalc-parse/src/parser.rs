//! Recursive-descent parser: precedence-climbing binary operators over a
//! `unary -> terminal` base, adapted from `formualizer-parse::parser`'s
//! shape to this grammar (§4.4).

use crate::ast::{ArgList, BinOp, BuiltinResolver, Expr, NodeId, ParseArena, UnOp};
use crate::tokenizer::{tokenize, Token, TokenKind};
use sheetcalc_common::{sentinel, Atom, AtomTable, CalcError, ErrorKind};

/// A parsed formula: the arena that owns its nodes, plus the root.
/// This is the parse-cache entry type — cloned wholesale into the scratch
/// arena on a cache hit (§4.4 "a parse cache hit produces a clone").
#[derive(Clone, Debug)]
pub struct ParsedFormula {
    pub arena: ParseArena,
    pub root: NodeId,
}

/// Parse `src` (the formula text, with or without a leading `=`) into a
/// fresh `ParsedFormula`. Never panics and never fails outright: syntax
/// errors become an `Expr::Error` root node, per §4.4 "All errors leave
/// parse state consistent."
pub fn parse(src: &[u8], atoms: &mut AtomTable, resolver: &dyn BuiltinResolver) -> ParsedFormula {
    let src = if src.first() == Some(&b'=') { &src[1..] } else { src };

    let toks = match tokenize(src, atoms) {
        Ok(t) => t,
        Err(e) => {
            let mut arena = ParseArena::new();
            let root = arena.push(Expr::Error(e));
            return ParsedFormula { arena, root };
        }
    };

    let mut p = Parser {
        toks: &toks,
        pos: 0,
        atoms: &*atoms,
        resolver,
        arena: ParseArena::new(),
    };
    let root = p.expr();
    let root = if !matches!(p.peek_kind(), TokenKind::Eof) {
        p.error(ErrorKind::Parse)
    } else {
        root
    };
    ParsedFormula { arena: p.arena, root }
}

struct Parser<'a> {
    toks: &'a [Token],
    pos: usize,
    atoms: &'a AtomTable,
    resolver: &'a dyn BuiltinResolver,
    arena: ParseArena,
}

impl<'a> Parser<'a> {
    fn peek_kind(&self) -> TokenKind {
        self.toks[self.pos].kind
    }

    fn advance(&mut self) -> Token {
        let t = self.toks[self.pos];
        if !matches!(t.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, want: TokenKind) -> bool {
        if self.peek_kind() == want {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, kind: ErrorKind) -> NodeId {
        self.arena.push(Expr::Error(CalcError::new(kind)))
    }

    // expr := comparison
    fn expr(&mut self) -> NodeId {
        self.comparison()
    }

    fn comparison(&mut self) -> NodeId {
        let mut lhs = self.addsub();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.addsub();
            lhs = self.arena.push(Expr::Binary { op, lhs, rhs });
        }
        lhs
    }

    fn addsub(&mut self) -> NodeId {
        let mut lhs = self.muldiv();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.muldiv();
            lhs = self.arena.push(Expr::Binary { op, lhs, rhs });
        }
        lhs
    }

    fn muldiv(&mut self) -> NodeId {
        let mut lhs = self.unary();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.unary();
            lhs = self.arena.push(Expr::Binary { op, lhs, rhs });
        }
        lhs
    }

    /// Collects the maximal prefix run of `+`/`-`/`!` before a terminal and
    /// folds it. A run made only of `+`/`-` in front of a numeric literal
    /// folds to a single `Number` (sign = parity of the minus count,
    /// independent of where the pluses sit — see SPEC_FULL.md §4.4's
    /// `-+-3` example). Any other run (one containing `!`, or one sitting
    /// in front of a non-literal) folds to nested `Unary` nodes instead,
    /// with `+` contributing no node at all.
    fn unary(&mut self) -> NodeId {
        let mut prefix: Vec<UnOp> = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Plus => {
                    self.advance();
                    prefix.push(UnOp::Plus);
                }
                TokenKind::Minus => {
                    self.advance();
                    prefix.push(UnOp::Neg);
                }
                TokenKind::Bang => {
                    self.advance();
                    prefix.push(UnOp::Not);
                }
                _ => break,
            }
        }

        if prefix.is_empty() {
            return self.terminal();
        }

        let all_sign_only = prefix.iter().all(|op| !matches!(op, UnOp::Not));
        if all_sign_only {
            if let TokenKind::Number(n) = self.peek_kind() {
                self.advance();
                let minus_count = prefix.iter().filter(|op| matches!(op, UnOp::Neg)).count();
                let value = if minus_count % 2 == 1 { -n } else { n };
                return self.arena.push(Expr::Number(value));
            }
        }

        let mut node = self.terminal();
        for op in prefix.into_iter().rev() {
            if matches!(op, UnOp::Plus) {
                continue;
            }
            node = self.arena.push(Expr::Unary { op, expr: node });
        }
        node
    }

    fn terminal(&mut self) -> NodeId {
        match self.peek_kind() {
            TokenKind::LBracket => self.range_literal(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr();
                if !self.eat(TokenKind::RParen) {
                    return self.error(ErrorKind::Parse);
                }
                self.arena.push(Expr::Group { expr: inner })
            }
            TokenKind::Number(n) => {
                self.advance();
                self.arena.push(Expr::Number(n))
            }
            TokenKind::StringLit(a) => {
                self.advance();
                self.arena.push(Expr::String(a))
            }
            TokenKind::Ident(_) => {
                if matches!(self.toks.get(self.pos + 1).map(|t| t.kind), Some(TokenKind::LParen)) {
                    self.call()
                } else {
                    self.range_shorthand()
                }
            }
            _ => self.error(ErrorKind::Parse),
        }
    }

    fn call(&mut self) -> NodeId {
        let name = match self.peek_kind() {
            TokenKind::Ident(a) => a,
            _ => return self.error(ErrorKind::Parse),
        };
        self.advance(); // ident
        self.advance(); // '('

        let mut args: ArgList = ArgList::new();
        if !matches!(self.peek_kind(), TokenKind::RParen) {
            loop {
                args.push(self.expr());
                if self.eat(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        if !self.eat(TokenKind::RParen) {
            return self.error(ErrorKind::Parse);
        }
        if args.len() > 4 {
            return self.error(ErrorKind::Arity);
        }

        // `name` came from an `intern_lower`'d ident token, so its bytes
        // are already lowercase.
        let name_str = self.atoms.get_str(name);
        match self.resolver.resolve(name_str) {
            Some(builtin) => self.arena.push(Expr::FunctionCall { builtin, argv: args }),
            None => self.arena.push(Expr::UserFunctionCall { name, argv: args }),
        }
    }

    // --- Range literals: `[ ... ]` ---------------------------------------

    fn range_literal(&mut self) -> NodeId {
        self.advance(); // '['
        let mut items: Vec<Item> = Vec::new();
        if matches!(self.peek_kind(), TokenKind::RBracket) {
            self.advance();
            return self.error(ErrorKind::Parse);
        }
        loop {
            match self.item() {
                Ok(it) => items.push(it),
                Err(id) => {
                    // Skip to ']' to leave the token stream in a sane state.
                    while !matches!(self.peek_kind(), TokenKind::RBracket | TokenKind::Eof) {
                        self.advance();
                    }
                    self.eat(TokenKind::RBracket);
                    return id;
                }
            }
            if self.eat(TokenKind::Comma) {
                continue;
            }
            break;
        }
        if !self.eat(TokenKind::RBracket) {
            return self.error(ErrorKind::Parse);
        }
        self.decode_range(items)
    }

    fn item(&mut self) -> Result<Item, NodeId> {
        match self.peek_kind() {
            TokenKind::Ident(a) | TokenKind::StringLit(a) => {
                self.advance();
                if self.eat(TokenKind::Colon) {
                    match self.peek_kind() {
                        TokenKind::Ident(b) | TokenKind::StringLit(b) => {
                            self.advance();
                            Ok(Item::NamePair(a, b))
                        }
                        _ => Err(self.error(ErrorKind::Parse)),
                    }
                } else {
                    Ok(Item::Name(a))
                }
            }
            TokenKind::Colon => {
                self.advance();
                let end = self.opt_row_value();
                Ok(Item::RowPair(None, end))
            }
            TokenKind::Number(_) | TokenKind::Dollar => {
                let start = self.row_value().expect("checked above");
                if self.eat(TokenKind::Colon) {
                    let end = self.opt_row_value();
                    Ok(Item::RowPair(Some(start), end))
                } else {
                    Ok(Item::Row(start))
                }
            }
            _ => Err(self.error(ErrorKind::Parse)),
        }
    }

    fn row_value(&mut self) -> Option<i32> {
        match self.peek_kind() {
            TokenKind::Number(n) => {
                self.advance();
                Some(n as i32)
            }
            TokenKind::Dollar => {
                self.advance();
                Some(sentinel::DOLLAR)
            }
            _ => None,
        }
    }

    fn opt_row_value(&mut self) -> Option<i32> {
        self.row_value()
    }

    fn decode_range(&mut self, items: Vec<Item>) -> NodeId {
        let finish_single = |raw: i32| -> i32 {
            if raw == sentinel::DOLLAR {
                raw
            } else {
                raw - 1
            }
        };
        let finish_pair = |start: Option<i32>, end: Option<i32>| -> (i32, i32) {
            let s = match start {
                None => 0,
                Some(v) if v == sentinel::DOLLAR => v,
                Some(v) => v - 1,
            };
            let e = match end {
                None => -1,
                Some(v) if v == sentinel::DOLLAR => v,
                Some(v) => v - 1,
            };
            (s, e)
        };

        let expr = match items.as_slice() {
            [Item::Name(col)] => Expr::Range1DColumn {
                col_name: *col,
                row_start: 0,
                row_end: -1,
            },
            [Item::NamePair(_, _)] => {
                return self.error(ErrorKind::Shape);
            }
            [Item::Name(sheet), Item::Name(col)] => Expr::ForeignRange1DColumn {
                sheet: *sheet,
                col_name: *col,
                row_start: 0,
                row_end: -1,
            },
            [Item::Name(col), Item::Row(n)] => Expr::Range0D {
                col_name: *col,
                row: finish_single(*n),
            },
            [Item::Name(col), Item::RowPair(s, e)] => {
                let (row_start, row_end) = finish_pair(*s, *e);
                Expr::Range1DColumn {
                    col_name: *col,
                    row_start,
                    row_end,
                }
            }
            [Item::NamePair(a, b), Item::Row(n)] => Expr::Range1DRow {
                col_start: *a,
                col_end: *b,
                row: finish_single(*n),
            },
            [Item::NamePair(_, _), Item::RowPair(_, _)] => {
                return self.error(ErrorKind::Shape);
            }
            [Item::Name(sheet), Item::Name(col), Item::Row(n)] => Expr::ForeignRange0D {
                sheet: *sheet,
                col_name: *col,
                row: finish_single(*n),
            },
            [Item::Name(sheet), Item::Name(col), Item::RowPair(s, e)] => {
                let (row_start, row_end) = finish_pair(*s, *e);
                Expr::ForeignRange1DColumn {
                    sheet: *sheet,
                    col_name: *col,
                    row_start,
                    row_end,
                }
            }
            [Item::Name(sheet), Item::NamePair(a, b), Item::Row(n)] => Expr::ForeignRange1DRow {
                sheet: *sheet,
                col_start: *a,
                col_end: *b,
                row: finish_single(*n),
            },
            [Item::Name(_), Item::NamePair(_, _), Item::RowPair(_, _)] => {
                return self.error(ErrorKind::Shape);
            }
            _ => {
                return self.error(ErrorKind::Parse);
            }
        };
        self.arena.push(expr)
    }

    // --- Bareword range shorthand: `a1`, `a$`, `a1:b3`, `a:b` ------------

    /// Mirrors `range_literal`'s decoding one level down, without brackets.
    /// A bare `col:col` with no row on either side means "whole row range
    /// at the caller's row" (no explicit row token exists to carry that
    /// meaning, so `$` is substituted implicitly); a combination that
    /// mixes a column pair with an explicit row on either side is the same
    /// 2-D shape the bracket grammar rejects.
    fn range_shorthand(&mut self) -> NodeId {
        let col1 = match self.peek_kind() {
            TokenKind::Ident(a) => a,
            _ => return self.error(ErrorKind::Parse),
        };
        self.advance();
        let row1 = self.row_value();

        if !self.eat(TokenKind::Colon) {
            return match row1 {
                Some(raw) => {
                    let row = if raw == sentinel::DOLLAR { raw } else { raw - 1 };
                    self.arena.push(Expr::Range0D { col_name: col1, row })
                }
                None => self.arena.push(Expr::Range1DColumn {
                    col_name: col1,
                    row_start: 0,
                    row_end: -1,
                }),
            };
        }

        let col2 = match self.peek_kind() {
            TokenKind::Ident(a) => {
                self.advance();
                Some(a)
            }
            _ => None,
        };
        let row2 = self.row_value();

        let expr = match (col2, row1, row2) {
            (Some(c2), None, None) => Expr::Range1DRow {
                col_start: col1,
                col_end: c2,
                row: sentinel::DOLLAR,
            },
            (None, r1, r2) => {
                let s = r1.map(|v| if v == sentinel::DOLLAR { v } else { v - 1 }).unwrap_or(0);
                let e = r2.map(|v| if v == sentinel::DOLLAR { v } else { v - 1 }).unwrap_or(-1);
                Expr::Range1DColumn {
                    col_name: col1,
                    row_start: s,
                    row_end: e,
                }
            }
            (Some(_), _, _) => {
                return self.error(ErrorKind::Shape);
            }
        };
        self.arena.push(expr)
    }
}

#[derive(Clone, Copy, Debug)]
enum Item {
    Name(Atom),
    NamePair(Atom, Atom),
    Row(i32),
    RowPair(Option<i32>, Option<i32>),
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoBuiltins;
    impl BuiltinResolver for NoBuiltins {
        fn resolve(&self, _name: &str) -> Option<crate::ast::BuiltinId> {
            None
        }
    }

    fn parse_ok(src: &str) -> ParsedFormula {
        let mut atoms = AtomTable::new();
        parse(src.as_bytes(), &mut atoms, &NoBuiltins)
    }

    #[test]
    fn leading_equals_sign_is_stripped() {
        let a = parse_ok("=1+1");
        let b = parse_ok("1+1");
        assert_eq!(format!("{:?}", a.arena), format!("{:?}", b.arena));
    }

    #[test]
    fn double_negative_folds_a_numeric_literal() {
        let f = parse_ok("--3");
        assert!(matches!(f.arena.get(f.root), Expr::Number(n) if *n == 3.0));
    }

    #[test]
    fn mixed_plus_minus_run_folds_by_minus_parity() {
        let f = parse_ok("-+-3");
        assert!(matches!(f.arena.get(f.root), Expr::Number(n) if *n == 3.0));
        let f = parse_ok("-+3");
        assert!(matches!(f.arena.get(f.root), Expr::Number(n) if *n == -3.0));
    }

    #[test]
    fn bareword_a1_is_a_zero_based_range0d() {
        let f = parse_ok("a1");
        match f.arena.get(f.root) {
            Expr::Range0D { row, .. } => assert_eq!(*row, 0),
            other => panic!("expected Range0D, got {other:?}"),
        }
    }

    #[test]
    fn bareword_dollar_row_is_the_dollar_sentinel() {
        let f = parse_ok("a$");
        match f.arena.get(f.root) {
            Expr::Range0D { row, .. } => assert_eq!(*row, sentinel::DOLLAR),
            other => panic!("expected Range0D, got {other:?}"),
        }
    }

    #[test]
    fn bracket_single_column_is_a_full_range() {
        let f = parse_ok("[c]");
        match f.arena.get(f.root) {
            Expr::Range1DColumn {
                row_start, row_end, ..
            } => {
                assert_eq!(*row_start, 0);
                assert_eq!(*row_end, -1);
            }
            other => panic!("expected Range1DColumn, got {other:?}"),
        }
    }

    #[test]
    fn bracket_two_names_is_a_whole_foreign_column() {
        let f = parse_ok("[other, a]");
        match f.arena.get(f.root) {
            Expr::ForeignRange1DColumn {
                row_start, row_end, ..
            } => {
                assert_eq!(*row_start, 0);
                assert_eq!(*row_end, -1);
            }
            other => panic!("expected ForeignRange1DColumn, got {other:?}"),
        }
    }

    #[test]
    fn bracket_foreign_cell_reference() {
        let f = parse_ok("[other, a, 2]");
        match f.arena.get(f.root) {
            Expr::ForeignRange0D { row, .. } => assert_eq!(*row, 1),
            other => panic!("expected ForeignRange0D, got {other:?}"),
        }
    }

    #[test]
    fn two_dimensional_bracket_range_is_a_shape_error() {
        let f = parse_ok("[c:d]");
        match f.arena.get(f.root) {
            Expr::Error(e) => assert_eq!(e.kind, ErrorKind::Shape),
            other => panic!("expected Error(Shape), got {other:?}"),
        }
    }

    #[test]
    fn unresolved_call_becomes_a_user_function_call() {
        let f = parse_ok("myfunc(1, 2)");
        assert!(matches!(f.arena.get(f.root), Expr::UserFunctionCall { .. }));
    }

    #[test]
    fn more_than_four_call_arguments_is_an_arity_error() {
        let f = parse_ok("f(1, 2, 3, 4, 5)");
        match f.arena.get(f.root) {
            Expr::Error(e) => assert_eq!(e.kind, ErrorKind::Arity),
            other => panic!("expected Error(Arity), got {other:?}"),
        }
    }

    #[test]
    fn string_literal_round_trips_to_expr_string() {
        let f = parse_ok("'hello'");
        assert!(matches!(f.arena.get(f.root), Expr::String(_)));
    }
}

//! The uniform error type. Every failure inside the engine — parse,
//! evaluation, or host-facing API misuse — is represented as a
//! `CalcError`, and every `CalcError` can be folded into an `Error`
//! expression node, because the evaluator treats errors as ordinary
//! (if contagious) values rather than exceptions.

use crate::atom::Atom;

/// The seven error categories named in §7.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorKind {
    /// Bad syntax: unterminated string/paren/bracket, malformed range literal.
    Parse,
    /// Unknown column name, unknown sheet, unknown named cell.
    Reference,
    /// Comparing strings with ordering; non-number argument to an arithmetic
    /// function.
    Type,
    /// Mismatched array lengths; a 2-D range literal.
    Shape,
    /// Wrong number of function arguments.
    Arity,
    /// Out-of-bounds row in `cell`, index overflow.
    Domain,
    /// Allocation failure, recursion-depth guard tripped.
    Resource,
}

impl ErrorKind {
    /// The text the driver emits when a `CalcError` carries no explicit
    /// message atom — the literal 5-byte `"error"` from §6.
    pub fn fallback_text(self) -> &'static str {
        "error"
    }

    fn label(self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse error",
            ErrorKind::Reference => "reference error",
            ErrorKind::Type => "type error",
            ErrorKind::Shape => "shape error",
            ErrorKind::Arity => "arity error",
            ErrorKind::Domain => "domain error",
            ErrorKind::Resource => "resource error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A uniform error value. `Copy` (an `Atom` is just a `u32`), so it can be
/// embedded directly in `Expr::Error` and compared cheaply.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CalcError {
    pub kind: ErrorKind,
    /// An interned, human-readable message. `None` means "use
    /// `ErrorKind::fallback_text()`".
    pub message: Option<Atom>,
}

impl CalcError {
    pub fn new(kind: ErrorKind) -> Self {
        CalcError {
            kind,
            message: None,
        }
    }

    pub fn with_message(kind: ErrorKind, message: Atom) -> Self {
        CalcError {
            kind,
            message: Some(message),
        }
    }
}

impl std::fmt::Display for CalcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for CalcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_text_is_the_literal_error_word() {
        assert_eq!(ErrorKind::Domain.fallback_text(), "error");
    }

    #[test]
    fn bare_error_has_no_message() {
        let e = CalcError::new(ErrorKind::Shape);
        assert_eq!(e.message, None);
    }
}

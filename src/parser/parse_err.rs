//! Parser error types and related utilities
//!

use thiserror::Error;

/// The "kind" of error generated during CDDL parsing.
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The input ended in the middle of a rule.
    #[error("Unexpected end of file")]
    UnexpectedEof,
    /// A rule name wasn't followed by `=`.
    #[error("Expected =")]
    ExpectedAssign,
    /// A rule didn't start with a rule name.
    #[error("Expected a rule id")]
    ExpectedId,
    /// A rule name that ends in `-` or `.`.
    #[error("Invalid rule id")]
    InvalidId,
    /// A rule definition didn't start with a group or type.
    #[error("Expected [ or {{ or (")]
    ExpectedGroupent,
    #[allow(missing_docs)]
    #[error("Expected , or ( or ]")]
    ExpectedCommaOrLeftParOrRightSqBracket,
    #[allow(missing_docs)]
    #[error("Expected , or ( or }}")]
    ExpectedCommaOrLeftParOrRightCurBracket,
    #[allow(missing_docs)]
    #[error("Expected , or )")]
    ExpectedCommaOrRightPar,
    #[allow(missing_docs)]
    #[error("Expected / or , or right bracket")]
    ExpectedSlashOrCommaOrRightBracket,
    /// A number literal didn't parse correctly.
    #[error("Invalid number")]
    InvalidNumber,
    /// A malformed text string.
    #[error("Invalid text string")]
    InvalidText,
    /// A reference to a rule that was never defined.
    #[error("Rule id lookup failed")]
    IdLookupFailed,
    /// The same rule name was defined twice.
    #[error("Duplicate rule id")]
    DuplicateRuleId,
}

/// An error that occurred during CDDL parsing.
///
/// `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
// thiserror will generate a Display implementation.
#[error("{kind} at line {line} and column {column}")]
pub struct ParseError {
    /// The "kind" of error generated during CDDL parsing.
    pub kind: ErrorKind,
    /// The line where the error was detected.
    pub line: usize,
    /// The column where the error was detected.
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ErrorKind, pos: Position) -> ParseError {
        ParseError {
            kind,
            line: pos.line,
            column: pos.column,
        }
    }
}

/// A location in the CDDL source text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column number.
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

//! This module defines error and result types.
//!

use crate::event::EventKind;
use crate::parser;
use std::fmt;
use std::result::Result;
use strum_macros::Display;
use thiserror::Error;

/// An error during CDDL parsing or validation.
#[non_exhaustive]
#[derive(Debug, PartialEq, Error)]
pub enum ValidateError {
    /// An error during CDDL parsing.
    #[error(transparent)]
    ParseError(#[from] parser::ParseError),
    /// A logical error in the CDDL structure.
    #[error("Structural({0})")]
    Structural(String),
    /// A data mismatch during validation.
    #[error("{0}")]
    Mismatch(Mismatch),
    /// A CDDL rule lookup failed.
    #[error("MissingRule({0})")]
    MissingRule(String),
    /// A CDDL feature that is unsupported.
    #[error("Unsupported {0}")]
    Unsupported(String),
    /// A data value that can't be validated by CDDL.
    #[error("ValueError({0})")]
    ValueError(String),
}

/// What the validator expected when a mismatch occurred.
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[allow(missing_docs)]
pub enum MismatchKind {
    ExpectedTstr,
    ExpectedUint,
    ExpectedInt,
    ExpectedNint,
    ExpectedFloat,
    ExpectedBool,
    ExpectedNil,
    ExpectedBstr,
    ExpectedArray,
    ExpectedMap,
    /// A map member was expected to start with a key.
    ExpectedName,
    /// A complete data item was expected.
    ExpectedValue,
    /// A map key that the rule doesn't define.
    UnknownKey,
    /// A required map key that never appeared.
    MissingKey,
    /// The event stream ended inside a container.
    UnexpectedEnd,
}

/// A data mismatch during validation.
///
/// If the CDDL specified an `int` and the data contained a string, this is
/// the error that would result.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// What was expected.
    pub kind: MismatchKind,
    /// The innermost map key or rule name being validated.
    pub rule: String,
    /// The event that was found instead, if any.
    pub found: Option<EventKind>,
    /// The reader's position, if it tracks one.
    pub position: Option<usize>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mismatch({} at {}", self.kind, self.rule)?;
        if let Some(found) = self.found {
            write!(f, ", found {}", found)?;
        }
        if let Some(position) = self.position {
            write!(f, ", position {}", position)?;
        }
        write!(f, ")")
    }
}

impl ValidateError {
    /// Identify whether this error is a data mismatch.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, ValidateError::Mismatch(_))
    }

    /// The mismatch details, if this error is a data mismatch.
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            ValidateError::Mismatch(m) => Some(m),
            _ => None,
        }
    }
}

/// A validation that doesn't return anything.
pub type ValidateResult = Result<(), ValidateError>;

/// Assertion helpers for tests.
///
/// Each method panics unless the result is the named kind of error.
#[doc(hidden)]
pub trait ErrorMatch {
    /// Expect a data mismatch and return it.
    fn err_mismatch(self) -> Mismatch;
    /// Expect a CDDL parse error and return it.
    fn err_parse(self) -> parser::ParseError;
    /// Expect an unsupported-feature error.
    fn err_unsupported(self);
    /// Expect a missing-rule error.
    fn err_missing_rule(self);
    /// Expect a structural error.
    fn err_structural(self);
}

impl ErrorMatch for ValidateResult {
    #[track_caller]
    fn err_mismatch(self) -> Mismatch {
        match self {
            Err(ValidateError::Mismatch(m)) => m,
            other => panic!("expected Mismatch, got {:?}", other),
        }
    }

    #[track_caller]
    fn err_parse(self) -> parser::ParseError {
        match self {
            Err(ValidateError::ParseError(e)) => e,
            other => panic!("expected ParseError, got {:?}", other),
        }
    }

    #[track_caller]
    fn err_unsupported(self) {
        match self {
            Err(ValidateError::Unsupported(_)) => (),
            other => panic!("expected Unsupported, got {:?}", other),
        }
    }

    #[track_caller]
    fn err_missing_rule(self) {
        match self {
            Err(ValidateError::MissingRule(_)) => (),
            other => panic!("expected MissingRule, got {:?}", other),
        }
    }

    #[track_caller]
    fn err_structural(self) {
        match self {
            Err(ValidateError::Structural(_)) => (),
            other => panic!("expected Structural, got {:?}", other),
        }
    }
}

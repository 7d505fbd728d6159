//! Errors raised while parsing ids.

use thiserror::Error;

/// Why a string could not be parsed into a typed id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input was empty.
    #[error("ID cannot be empty")]
    Empty,

    /// No `_` between prefix and ULID.
    #[error("ID missing underscore separator")]
    MissingSeparator,

    /// The prefix belongs to another id type.
    #[error("invalid ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The part after the separator is not a ULID.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),
}

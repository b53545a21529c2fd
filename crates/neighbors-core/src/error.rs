//! Errors raised while building value objects from untrusted input.

use thiserror::Error;

/// Errors that can occur when constructing or parsing domain values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A string did not name a known variant of an enum.
    #[error("invalid {kind}: {value}")]
    InvalidEnum { kind: &'static str, value: String },

    /// Karma arrived below zero.
    #[error("karma cannot be negative: {0}")]
    NegativeKarma(i64),
}

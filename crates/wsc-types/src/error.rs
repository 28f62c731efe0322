use thiserror::Error;

use crate::state::MergeState;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid merge state transition: {from} -> {to}")]
    InvalidTransition { from: MergeState, to: MergeState },
}

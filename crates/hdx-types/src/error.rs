use thiserror::Error;

/// Errors produced by value and descriptor operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape { shape: Vec<u64>, reason: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("malformed text payload: {0}")]
    MalformedText(String),
}

use hdx_store::StoreError;
use hdx_types::TypeError;
use thiserror::Error;

/// Errors from attribute operations.
#[derive(Debug, Error)]
pub enum AttrError {
    /// The parent node, handle or container is no longer live.
    #[error("invalid: {0}")]
    Invalid(String),

    /// A name that must exist does not.
    #[error("attribute not found: {0}")]
    NotFound(String),

    /// The name is already taken on the parent.
    #[error("attribute already exists: {0}")]
    AlreadyExists(String),

    /// Keyed lookup through an attribute view found nothing.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// No free temporary name could be found for an overwrite.
    #[error("no free temporary attribute name after {attempts} attempts")]
    TempNameExhausted { attempts: u32 },

    /// The payload could not be encoded or decoded.
    #[error("type error: {0}")]
    Type(#[from] TypeError),

    /// Any other backend failure, propagated unmodified.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AttrError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidNode(id) => Self::Invalid(format!("node {id} is not live")),
            StoreError::InvalidRecord(id) => Self::Invalid(format!("record {id} is not open")),
            StoreError::Closed => Self::Invalid("container is closed".into()),
            StoreError::NotFound { name } => Self::NotFound(name),
            StoreError::AlreadyExists { name } => Self::AlreadyExists(name),
            other => Self::Store(other),
        }
    }
}

/// Result alias for attribute operations.
pub type AttrResult<T> = Result<T, AttrError>;

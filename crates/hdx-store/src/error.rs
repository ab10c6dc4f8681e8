use std::path::PathBuf;

use hdx_types::{Datatype, NodeId, RecordId};

/// Errors from backend record and container operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The node id does not name a live node.
    #[error("invalid node: {0}")]
    InvalidNode(NodeId),

    /// The record id is not an open record handle.
    #[error("invalid record handle: {0}")]
    InvalidRecord(RecordId),

    /// The container has been closed; every derived handle is dead.
    #[error("container is closed")]
    Closed,

    /// No attribute with this name exists on the node.
    #[error("attribute not found: {name}")]
    NotFound { name: String },

    /// An attribute with this name already exists on the node.
    #[error("attribute already exists: {name}")]
    AlreadyExists { name: String },

    /// No node exists at this path.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A node already exists at this path.
    #[error("node already exists: {0}")]
    NodeExists(String),

    /// Attribute or node name is not acceptable.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// The container was opened read-only.
    #[error("container is read-only")]
    ReadOnly,

    /// The in-memory datatype differs from the record's stored datatype.
    #[error("datatype mismatch: record holds {stored}, requested {requested}")]
    DatatypeMismatch { stored: Datatype, requested: Datatype },

    /// The payload does not match the record's datatype and dataspace.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The payload exceeds the configured attribute size limit.
    #[error("payload of {size} bytes exceeds the {limit} byte attribute limit")]
    TooLarge { size: u64, limit: u64 },

    /// A container file already exists at this path.
    #[error("container already exists: {0}")]
    ContainerExists(PathBuf),

    /// The container file failed validation on load.
    #[error("corrupt container: {0}")]
    Corrupt(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Internal lock was poisoned by a panicking thread.
    #[error("backend lock poisoned")]
    Poisoned,

    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

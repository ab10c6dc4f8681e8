//! Record storage for HDX containers.
//!
//! This crate is the trusted storage layer underneath the attribute
//! subsystem. It exposes the record primitives (create, open, read, write,
//! rename, delete, exists, enumerate, close) through the [`Backend`] trait and
//! provides container sessions that persist to a single file.
//!
//! # Storage Backends
//!
//! - [`InMemoryBackend`] -- `HashMap`-based working set of one container session
//!
//! # Design Rules
//!
//! 1. A record's datatype and dataspace are fixed at creation.
//! 2. `RecordId::INVALID` is never handed out and never accepted.
//! 3. Closing a container invalidates every node and record id derived from it.
//! 4. Container images are replaced atomically (write temp, sync, rename).
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod container;
pub mod error;
pub mod file;
pub mod memory;
pub mod node;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{AccessMode, ContainerConfig, SyncMode};
pub use container::Container;
pub use error::{StoreError, StoreResult};
pub use file::{AttributeImage, ContainerImage, NodeImage};
pub use memory::InMemoryBackend;
pub use node::Node;
pub use traits::{Backend, IterOrder, NodeInfo, NodeKind, RecordInfo};

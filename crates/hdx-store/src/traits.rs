use hdx_types::{Dataspace, Datatype, NodeId, RecordId};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// The kind of object a node is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The container root (`/`).
    Root,
    Group,
    Dataset,
    NamedType,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Group => write!(f, "group"),
            Self::Dataset => write!(f, "dataset"),
            Self::NamedType => write!(f, "named type"),
        }
    }
}

/// Index used when enumerating attribute names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IterOrder {
    /// Order in which attributes were created.
    Creation,
    /// Byte-wise name order.
    Name,
}

/// Node introspection result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub kind: NodeKind,
    /// Number of attributes currently attached to the node.
    pub attribute_count: usize,
}

/// Descriptors of an open record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordInfo {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// Bytes of payload currently stored (zero until first write).
    pub storage_size: u64,
}

/// Record storage primitives of a container.
///
/// Implementations must satisfy these invariants:
/// - Record ids handed out by `create_record`/`open_record` are never
///   `RecordId::INVALID`.
/// - Every primitive fails (never succeeds silently) once the container is
///   closed or when given a dead node or record id.
/// - A record's datatype and dataspace never change after creation.
/// - All I/O errors are propagated, never silently ignored.
pub trait Backend: Send + Sync {
    /// Returns `true` while the owning container is open.
    fn is_open(&self) -> bool;

    /// Returns `true` if `node` names a live node of an open container.
    fn is_node_valid(&self, node: NodeId) -> bool;

    /// Returns `true` if `record` is an open record handle.
    fn is_record_valid(&self, record: RecordId) -> bool;

    /// Introspect a node.
    fn node_info(&self, node: NodeId) -> StoreResult<NodeInfo>;

    /// Allocate a new attribute record. Writes no payload.
    fn create_record(
        &self,
        parent: NodeId,
        name: &str,
        datatype: &Datatype,
        dataspace: &Dataspace,
    ) -> StoreResult<RecordId>;

    /// Open an existing attribute record.
    fn open_record(&self, parent: NodeId, name: &str) -> StoreResult<RecordId>;

    /// Stored descriptors of an open record.
    fn record_info(&self, record: RecordId) -> StoreResult<RecordInfo>;

    /// Read the payload as `datatype`, which must be the stored datatype.
    ///
    /// A record that was never written reads as its fill value (zero bytes
    /// for numeric kinds, empty strings for text).
    fn read_record(&self, record: RecordId, datatype: &Datatype) -> StoreResult<Vec<u8>>;

    /// Replace the payload of an open record.
    fn write_record(&self, record: RecordId, datatype: &Datatype, bytes: &[u8]) -> StoreResult<()>;

    /// Rename an attribute on `parent`.
    fn rename_record(&self, parent: NodeId, old_name: &str, new_name: &str) -> StoreResult<()>;

    /// Delete an attribute from `parent`.
    fn delete_record(&self, parent: NodeId, name: &str) -> StoreResult<()>;

    /// Check whether `parent` has an attribute named `name`.
    fn record_exists(&self, parent: NodeId, name: &str) -> StoreResult<bool>;

    /// Visit every attribute name of `parent` in forward `order`.
    ///
    /// Names are snapshotted before the first call, so the visitor may call
    /// back into the backend, including mutating primitives.
    fn visit_names(
        &self,
        parent: NodeId,
        order: IterOrder,
        visitor: &mut dyn FnMut(&str),
    ) -> StoreResult<()>;

    /// The order the container enumerates in when the caller has no preference.
    fn native_order(&self) -> IterOrder;

    /// Release an open record handle.
    fn close_record(&self, record: RecordId) -> StoreResult<()>;

    /// Collect every attribute name of `parent` in forward `order`.
    ///
    /// Default implementation drives `visit_names()`.
    fn enumerate_names(&self, parent: NodeId, order: IterOrder) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        self.visit_names(parent, order, &mut |name: &str| names.push(name.to_owned()))?;
        Ok(names)
    }
}

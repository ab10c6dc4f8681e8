use std::sync::Arc;

use hdx_types::NodeId;

use crate::error::StoreResult;
use crate::traits::{Backend, NodeInfo};

/// Reference to a node that can host attributes.
///
/// Cheap to clone: a shared backend reference plus the node id. A `Node`
/// outliving its container stays constructible but reports
/// `is_valid() == false`, and every backend call through it fails.
#[derive(Clone)]
pub struct Node {
    backend: Arc<dyn Backend>,
    id: NodeId,
    path: Arc<str>,
}

impl Node {
    pub fn new(backend: Arc<dyn Backend>, id: NodeId, path: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            id,
            path: path.into(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Absolute path at the time the reference was taken.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The backend of the owning container.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Returns `true` while the container is open and the node exists.
    pub fn is_valid(&self) -> bool {
        self.backend.is_node_valid(self.id)
    }

    /// Kind and attribute count.
    pub fn info(&self) -> StoreResult<NodeInfo> {
        self.backend.node_info(self.id)
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

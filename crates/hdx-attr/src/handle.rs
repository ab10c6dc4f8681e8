//! Owning handles to open attribute records.
//!
//! An [`AttributeHandle`] owns exactly one backend record id. `close` is
//! idempotent and is the primary way to release it; `Drop` releases a handle
//! the caller forgot to close.

use std::sync::Arc;

use hdx_store::{Backend, Node, RecordInfo};
use hdx_types::{Dataspace, Datatype, NodeId, RecordId};
use tracing::{debug, warn};

use crate::error::{AttrError, AttrResult};

/// Fail with `Invalid` unless `node` is live.
pub(crate) fn ensure_live(node: &Node) -> AttrResult<()> {
    if node.is_valid() {
        Ok(())
    } else {
        Err(AttrError::Invalid(format!("node {} is not live", node.path())))
    }
}

/// An open attribute record.
pub struct AttributeHandle {
    id: RecordId,
    backend: Arc<dyn Backend>,
    parent: NodeId,
    name: String,
}

impl AttributeHandle {
    /// Open the existing attribute `name` on `parent`.
    pub fn open(parent: &Node, name: &str) -> AttrResult<Self> {
        ensure_live(parent)?;
        let id = parent.backend().open_record(parent.id(), name)?;
        Ok(Self::from_parts(id, parent, name))
    }

    /// Create a new attribute record. No payload is written.
    pub fn create(
        parent: &Node,
        name: &str,
        datatype: &Datatype,
        dataspace: &Dataspace,
    ) -> AttrResult<Self> {
        ensure_live(parent)?;
        let id = parent
            .backend()
            .create_record(parent.id(), name, datatype, dataspace)?;
        Ok(Self::from_parts(id, parent, name))
    }

    fn from_parts(id: RecordId, parent: &Node, name: &str) -> Self {
        Self {
            id,
            backend: parent.backend().clone(),
            parent: parent.id(),
            name: name.to_string(),
        }
    }

    /// Backend id, or `RecordId::INVALID` once closed.
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Name the handle was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node the attribute is attached to.
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    /// Returns `true` until closed or until the container closes.
    pub fn is_open(&self) -> bool {
        self.id.is_valid() && self.backend.is_open()
    }

    /// Stored descriptors and payload size.
    pub fn info(&self) -> AttrResult<RecordInfo> {
        Ok(self.backend.record_info(self.live_id()?)?)
    }

    pub fn datatype(&self) -> AttrResult<Datatype> {
        self.info().map(|info| info.datatype)
    }

    pub fn dataspace(&self) -> AttrResult<Dataspace> {
        self.info().map(|info| info.dataspace)
    }

    /// The id to hand to the backend, or `Invalid` if the handle is dead.
    pub(crate) fn live_id(&self) -> AttrResult<RecordId> {
        if !self.id.is_valid() {
            return Err(AttrError::Invalid(format!(
                "attribute handle for {:?} is closed",
                self.name
            )));
        }
        if !self.backend.is_open() {
            return Err(AttrError::Invalid("container is closed".into()));
        }
        Ok(self.id)
    }

    pub(crate) fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Release the backend record.
    ///
    /// No-op on a closed handle or after the container has closed (the
    /// container already released everything).
    pub fn close(&mut self) -> AttrResult<()> {
        let id = std::mem::replace(&mut self.id, RecordId::INVALID);
        if !id.is_valid() || !self.backend.is_open() {
            return Ok(());
        }
        self.backend.close_record(id)?;
        Ok(())
    }
}

impl Drop for AttributeHandle {
    fn drop(&mut self) {
        if !self.id.is_valid() {
            return;
        }
        debug!(name = %self.name, record = %self.id, "releasing unclosed attribute handle");
        if let Err(e) = self.close() {
            warn!(name = %self.name, error = %e, "failed to release attribute handle");
        }
    }
}

impl std::fmt::Debug for AttributeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeHandle")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("name", &self.name)
            .finish()
    }
}

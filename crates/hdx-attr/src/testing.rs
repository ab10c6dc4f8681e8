//! Fault-injecting backend used by the unit tests.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hdx_store::{
    Backend, ContainerConfig, InMemoryBackend, IterOrder, Node, NodeInfo, RecordInfo, StoreError,
    StoreResult,
};
use hdx_types::{Dataspace, Datatype, NodeId, RecordId};

#[derive(Clone, Copy, Debug)]
pub(crate) enum Fault {
    Read,
    Write,
    Rename,
}

/// Wraps an [`InMemoryBackend`] and fails the next armed primitive once.
pub(crate) struct FaultyBackend {
    inner: Arc<InMemoryBackend>,
    fail_read: AtomicBool,
    fail_write: AtomicBool,
    fail_rename: AtomicBool,
}

impl FaultyBackend {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryBackend::new(&ContainerConfig::default())),
            fail_read: AtomicBool::new(false),
            fail_write: AtomicBool::new(false),
            fail_rename: AtomicBool::new(false),
        }
    }

    pub(crate) fn arm(&self, fault: Fault) {
        match fault {
            Fault::Read => self.fail_read.store(true, Ordering::SeqCst),
            Fault::Write => self.fail_write.store(true, Ordering::SeqCst),
            Fault::Rename => self.fail_rename.store(true, Ordering::SeqCst),
        }
    }

    pub(crate) fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    fn trip(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.swap(false, Ordering::SeqCst) {
            Err(StoreError::Io(io::Error::other(format!(
                "injected {what} failure"
            ))))
        } else {
            Ok(())
        }
    }
}

/// A fault-injecting backend and its root node.
pub(crate) fn faulty_root() -> (Arc<FaultyBackend>, Node) {
    let backend = Arc::new(FaultyBackend::new());
    let node = Node::new(backend.clone(), NodeId::ROOT, "/");
    (backend, node)
}

impl Backend for FaultyBackend {
    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn is_node_valid(&self, node: NodeId) -> bool {
        self.inner.is_node_valid(node)
    }

    fn is_record_valid(&self, record: RecordId) -> bool {
        self.inner.is_record_valid(record)
    }

    fn node_info(&self, node: NodeId) -> StoreResult<NodeInfo> {
        self.inner.node_info(node)
    }

    fn create_record(
        &self,
        parent: NodeId,
        name: &str,
        datatype: &Datatype,
        dataspace: &Dataspace,
    ) -> StoreResult<RecordId> {
        self.inner.create_record(parent, name, datatype, dataspace)
    }

    fn open_record(&self, parent: NodeId, name: &str) -> StoreResult<RecordId> {
        self.inner.open_record(parent, name)
    }

    fn record_info(&self, record: RecordId) -> StoreResult<RecordInfo> {
        self.inner.record_info(record)
    }

    fn read_record(&self, record: RecordId, datatype: &Datatype) -> StoreResult<Vec<u8>> {
        Self::trip(&self.fail_read, "read")?;
        self.inner.read_record(record, datatype)
    }

    fn write_record(&self, record: RecordId, datatype: &Datatype, bytes: &[u8]) -> StoreResult<()> {
        Self::trip(&self.fail_write, "write")?;
        self.inner.write_record(record, datatype, bytes)
    }

    fn rename_record(&self, parent: NodeId, old_name: &str, new_name: &str) -> StoreResult<()> {
        Self::trip(&self.fail_rename, "rename")?;
        self.inner.rename_record(parent, old_name, new_name)
    }

    fn delete_record(&self, parent: NodeId, name: &str) -> StoreResult<()> {
        self.inner.delete_record(parent, name)
    }

    fn record_exists(&self, parent: NodeId, name: &str) -> StoreResult<bool> {
        self.inner.record_exists(parent, name)
    }

    fn visit_names(
        &self,
        parent: NodeId,
        order: IterOrder,
        visitor: &mut dyn FnMut(&str),
    ) -> StoreResult<()> {
        self.inner.visit_names(parent, order, visitor)
    }

    fn native_order(&self) -> IterOrder {
        self.inner.native_order()
    }

    fn close_record(&self, record: RecordId) -> StoreResult<()> {
        self.inner.close_record(record)
    }
}

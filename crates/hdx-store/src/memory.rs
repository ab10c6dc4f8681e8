use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use hdx_types::{Dataspace, Datatype, NodeId, RecordId};
use tracing::debug;

use crate::config::ContainerConfig;
use crate::error::{StoreError, StoreResult};
use crate::file::{AttributeImage, ContainerImage, NodeImage};
use crate::traits::{Backend, IterOrder, NodeInfo, NodeKind, RecordInfo};

/// One attribute record attached to a node.
#[derive(Clone, Debug)]
struct StoredAttribute {
    /// Stable identity that survives renames; open handles point at it.
    key: u64,
    name: String,
    datatype: Datatype,
    dataspace: Dataspace,
    data: Option<Vec<u8>>,
}

impl StoredAttribute {
    /// Zeroed payload; for text that is one NUL per element, every string
    /// empty.
    fn fill_value(&self) -> StoreResult<Vec<u8>> {
        let len = min_payload_len(&self.datatype, &self.dataspace)?;
        let len = usize::try_from(len).map_err(|_| overflow(&self.dataspace))?;
        Ok(vec![0; len])
    }
}

#[derive(Clone, Debug)]
struct NodeEntry {
    path: String,
    kind: NodeKind,
    /// Attributes in creation order.
    attributes: Vec<StoredAttribute>,
}

impl NodeEntry {
    fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }
}

#[derive(Clone, Copy, Debug)]
struct OpenRecord {
    node: NodeId,
    key: u64,
}

#[derive(Debug, Default)]
struct State {
    /// Node ids increase with creation, so parents sort before children.
    nodes: HashMap<NodeId, NodeEntry>,
    paths: HashMap<String, NodeId>,
    open: HashMap<RecordId, OpenRecord>,
    next_node: u64,
    next_record: u64,
    next_key: u64,
}

impl State {
    fn node(&self, id: NodeId) -> StoreResult<&NodeEntry> {
        self.nodes.get(&id).ok_or(StoreError::InvalidNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> StoreResult<&mut NodeEntry> {
        self.nodes.get_mut(&id).ok_or(StoreError::InvalidNode(id))
    }

    fn open_record(&self, record: RecordId) -> StoreResult<OpenRecord> {
        self.open.get(&record).copied().ok_or(StoreError::InvalidRecord(record))
    }

    /// The attribute an open record points at.
    fn attribute(&self, record: RecordId) -> StoreResult<&StoredAttribute> {
        let open = self.open_record(record)?;
        self.node(open.node)?
            .attributes
            .iter()
            .find(|a| a.key == open.key)
            .ok_or(StoreError::InvalidRecord(record))
    }

    fn attribute_mut(&mut self, record: RecordId) -> StoreResult<&mut StoredAttribute> {
        let open = self.open_record(record)?;
        self.node_mut(open.node)?
            .attributes
            .iter_mut()
            .find(|a| a.key == open.key)
            .ok_or(StoreError::InvalidRecord(record))
    }

    fn insert_node(&mut self, path: String, kind: NodeKind) -> NodeId {
        let id = NodeId::from_raw(self.next_node);
        self.next_node += 1;
        self.paths.insert(path.clone(), id);
        self.nodes.insert(
            id,
            NodeEntry {
                path,
                kind,
                attributes: Vec::new(),
            },
        );
        id
    }

    fn allocate_record(&mut self, node: NodeId, key: u64) -> RecordId {
        self.next_record += 1;
        let id = RecordId::from_raw(self.next_record);
        self.open.insert(id, OpenRecord { node, key });
        id
    }
}

/// In-memory record backend.
///
/// Holds the working set of one container session. All state lives behind a
/// `RwLock`; invalidation (container close) is a lock-free flag so handles
/// can be checked cheaply.
pub struct InMemoryBackend {
    state: RwLock<State>,
    closed: AtomicBool,
    read_only: bool,
    track_creation_order: bool,
    max_attribute_size: u64,
}

impl InMemoryBackend {
    /// A new backend holding only the root node.
    pub fn new(config: &ContainerConfig) -> Self {
        let mut state = State::default();
        state.insert_node("/".into(), NodeKind::Root);
        Self::with_state(state, config.track_creation_order, config.max_attribute_size, false)
    }

    /// Rebuild a backend from a loaded image. Ordering and the size limit
    /// come from the image, not from the session config.
    pub fn from_image(image: ContainerImage, read_only: bool) -> StoreResult<Self> {
        match image.nodes.first() {
            Some(root) if root.path == "/" && root.kind == NodeKind::Root => {}
            _ => return Err(StoreError::Corrupt("image does not start with the root node".into())),
        }
        let mut state = State::default();
        for node in image.nodes {
            if state.paths.contains_key(&node.path) {
                return Err(StoreError::Corrupt(format!("duplicate node path {}", node.path)));
            }
            let id = state.insert_node(node.path, node.kind);
            let mut attributes = Vec::with_capacity(node.attributes.len());
            for attr in node.attributes {
                let size = min_payload_len(&attr.datatype, &attr.dataspace)
                    .map_err(|e| StoreError::Corrupt(format!("attribute {:?}: {e}", attr.name)))?;
                if size > image.max_attribute_size {
                    return Err(StoreError::Corrupt(format!(
                        "attribute {:?} needs {size} bytes, over the {} byte limit",
                        attr.name, image.max_attribute_size
                    )));
                }
                state.next_key += 1;
                attributes.push(StoredAttribute {
                    key: state.next_key,
                    name: attr.name,
                    datatype: attr.datatype,
                    dataspace: attr.dataspace,
                    data: attr.data,
                });
            }
            state.node_mut(id)?.attributes = attributes;
        }
        Ok(Self::with_state(
            state,
            image.track_creation_order,
            image.max_attribute_size,
            read_only,
        ))
    }

    fn with_state(
        state: State,
        track_creation_order: bool,
        max_attribute_size: u64,
        read_only: bool,
    ) -> Self {
        Self {
            state: RwLock::new(state),
            closed: AtomicBool::new(false),
            read_only,
            track_creation_order,
            max_attribute_size,
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    /// Write lock for mutating primitives; rejects read-only sessions.
    fn write_mut(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        let guard = self.write()?;
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(guard)
    }

    /// Snapshot the whole container for persistence.
    pub fn to_image(&self) -> StoreResult<ContainerImage> {
        let state = self.read()?;
        let mut ids: Vec<&NodeId> = state.nodes.keys().collect();
        ids.sort();
        let nodes = ids
            .into_iter()
            .map(|id| {
                let node = &state.nodes[id];
                NodeImage {
                    path: node.path.clone(),
                    kind: node.kind,
                    attributes: node
                        .attributes
                        .iter()
                        .map(|a| AttributeImage {
                            name: a.name.clone(),
                            datatype: a.datatype,
                            dataspace: a.dataspace.clone(),
                            data: a.data.clone(),
                        })
                        .collect(),
                }
            })
            .collect();
        Ok(ContainerImage {
            track_creation_order: self.track_creation_order,
            max_attribute_size: self.max_attribute_size,
            nodes,
        })
    }

    /// Look up a node by absolute path (`/`, `/a/b`).
    pub fn resolve(&self, path: &str) -> StoreResult<NodeId> {
        let path = normalize_path(path)?;
        let state = self.read()?;
        state
            .paths
            .get(&path)
            .copied()
            .ok_or(StoreError::NodeNotFound(path))
    }

    /// Create a node at `path`. The parent must already exist.
    pub fn create_node(&self, path: &str, kind: NodeKind) -> StoreResult<NodeId> {
        if kind == NodeKind::Root {
            return Err(StoreError::InvalidName {
                name: path.to_string(),
                reason: "only the container root may be a root node".into(),
            });
        }
        let path = normalize_path(path)?;
        let (parent, _) = split_parent(&path).ok_or_else(|| StoreError::NodeExists(path.clone()))?;
        let mut state = self.write_mut()?;
        if state.paths.contains_key(&path) {
            return Err(StoreError::NodeExists(path.clone()));
        }
        if !state.paths.contains_key(parent) {
            return Err(StoreError::NodeNotFound(parent.to_string()));
        }
        let id = state.insert_node(path.clone(), kind);
        debug!(node = %id, path = %path, kind = %kind, "node created");
        Ok(id)
    }

    /// Absolute path of a live node.
    pub fn node_path(&self, node: NodeId) -> StoreResult<String> {
        Ok(self.read()?.node(node)?.path.clone())
    }

    /// Number of record handles currently open.
    pub fn open_record_count(&self) -> usize {
        self.read().map(|s| s.open.len()).unwrap_or(0)
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Mark the container closed. Every node and record id dies with it.
    pub fn invalidate(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut state) = self.state.write() {
            let leaked = state.open.len();
            state.open.clear();
            if leaked > 0 {
                debug!(leaked, "closing container with open record handles");
            }
        }
    }
}

impl Backend for InMemoryBackend {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    fn is_node_valid(&self, node: NodeId) -> bool {
        self.read().map(|s| s.nodes.contains_key(&node)).unwrap_or(false)
    }

    fn is_record_valid(&self, record: RecordId) -> bool {
        record.is_valid() && self.read().map(|s| s.open.contains_key(&record)).unwrap_or(false)
    }

    fn node_info(&self, node: NodeId) -> StoreResult<NodeInfo> {
        let state = self.read()?;
        let entry = state.node(node)?;
        Ok(NodeInfo {
            kind: entry.kind,
            attribute_count: entry.attributes.len(),
        })
    }

    fn create_record(
        &self,
        parent: NodeId,
        name: &str,
        datatype: &Datatype,
        dataspace: &Dataspace,
    ) -> StoreResult<RecordId> {
        validate_attribute_name(name)?;
        let size = min_payload_len(datatype, dataspace)?;
        if size > self.max_attribute_size {
            return Err(StoreError::TooLarge {
                size,
                limit: self.max_attribute_size,
            });
        }
        let mut state = self.write_mut()?;
        if state.node(parent)?.position(name).is_some() {
            return Err(StoreError::AlreadyExists { name: name.to_string() });
        }
        state.next_key += 1;
        let key = state.next_key;
        state.node_mut(parent)?.attributes.push(StoredAttribute {
            key,
            name: name.to_string(),
            datatype: *datatype,
            dataspace: dataspace.clone(),
            data: None,
        });
        let record = state.allocate_record(parent, key);
        debug!(node = %parent, name, record = %record, datatype = %datatype, "record created");
        Ok(record)
    }

    fn open_record(&self, parent: NodeId, name: &str) -> StoreResult<RecordId> {
        let mut state = self.write()?;
        let node = state.node(parent)?;
        let key = node
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.key)
            .ok_or_else(|| StoreError::NotFound { name: name.to_string() })?;
        Ok(state.allocate_record(parent, key))
    }

    fn record_info(&self, record: RecordId) -> StoreResult<RecordInfo> {
        let state = self.read()?;
        let attr = state.attribute(record)?;
        Ok(RecordInfo {
            name: attr.name.clone(),
            datatype: attr.datatype,
            dataspace: attr.dataspace.clone(),
            storage_size: attr.data.as_ref().map(|d| d.len() as u64).unwrap_or(0),
        })
    }

    fn read_record(&self, record: RecordId, datatype: &Datatype) -> StoreResult<Vec<u8>> {
        let state = self.read()?;
        let attr = state.attribute(record)?;
        if attr.datatype != *datatype {
            return Err(StoreError::DatatypeMismatch {
                stored: attr.datatype,
                requested: *datatype,
            });
        }
        Ok(match &attr.data {
            Some(data) => data.clone(),
            None => attr.fill_value()?,
        })
    }

    fn write_record(&self, record: RecordId, datatype: &Datatype, bytes: &[u8]) -> StoreResult<()> {
        let limit = self.max_attribute_size;
        let mut state = self.write_mut()?;
        let attr = state.attribute_mut(record)?;
        if attr.datatype != *datatype {
            return Err(StoreError::DatatypeMismatch {
                stored: attr.datatype,
                requested: *datatype,
            });
        }
        if bytes.len() as u64 > limit {
            return Err(StoreError::TooLarge {
                size: bytes.len() as u64,
                limit,
            });
        }
        check_payload(&attr.datatype, &attr.dataspace, bytes)?;
        attr.data = Some(bytes.to_vec());
        debug!(record = %record, name = %attr.name, len = bytes.len(), "record written");
        Ok(())
    }

    fn rename_record(&self, parent: NodeId, old_name: &str, new_name: &str) -> StoreResult<()> {
        validate_attribute_name(new_name)?;
        let mut state = self.write_mut()?;
        let node = state.node_mut(parent)?;
        let index = node
            .position(old_name)
            .ok_or_else(|| StoreError::NotFound { name: old_name.to_string() })?;
        if old_name == new_name {
            return Ok(());
        }
        if node.position(new_name).is_some() {
            return Err(StoreError::AlreadyExists { name: new_name.to_string() });
        }
        node.attributes[index].name = new_name.to_string();
        debug!(node = %parent, from = old_name, to = new_name, "record renamed");
        Ok(())
    }

    fn delete_record(&self, parent: NodeId, name: &str) -> StoreResult<()> {
        let mut state = self.write_mut()?;
        let node = state.node_mut(parent)?;
        let index = node
            .position(name)
            .ok_or_else(|| StoreError::NotFound { name: name.to_string() })?;
        node.attributes.remove(index);
        debug!(node = %parent, name, "record deleted");
        Ok(())
    }

    fn record_exists(&self, parent: NodeId, name: &str) -> StoreResult<bool> {
        Ok(self.read()?.node(parent)?.position(name).is_some())
    }

    fn visit_names(
        &self,
        parent: NodeId,
        order: IterOrder,
        visitor: &mut dyn FnMut(&str),
    ) -> StoreResult<()> {
        let mut names: Vec<String> = {
            let state = self.read()?;
            state.node(parent)?.attributes.iter().map(|a| a.name.clone()).collect()
        };
        if order == IterOrder::Name {
            names.sort_unstable();
        }
        names.iter().for_each(|name| visitor(name));
        Ok(())
    }

    fn native_order(&self) -> IterOrder {
        if self.track_creation_order {
            IterOrder::Creation
        } else {
            IterOrder::Name
        }
    }

    fn close_record(&self, record: RecordId) -> StoreResult<()> {
        let mut state = self.write()?;
        state
            .open
            .remove(&record)
            .map(|_| ())
            .ok_or(StoreError::InvalidRecord(record))
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node_count = self.read().map(|s| s.nodes.len()).unwrap_or(0);
        f.debug_struct("InMemoryBackend")
            .field("node_count", &node_count)
            .field("open_records", &self.open_record_count())
            .field("read_only", &self.read_only)
            .field("closed", &!self.is_open())
            .finish()
    }
}

/// Check that `bytes` is a well-formed payload for the descriptors.
fn check_payload(datatype: &Datatype, dataspace: &Dataspace, bytes: &[u8]) -> StoreResult<()> {
    let count = dataspace.element_count().ok_or_else(|| overflow(dataspace))?;
    match datatype.element_size() {
        Some(_) => {
            let expected = min_payload_len(datatype, dataspace)?;
            if bytes.len() as u64 != expected {
                return Err(StoreError::InvalidPayload(format!(
                    "expected {expected} bytes for {count} x {datatype}, got {}",
                    bytes.len()
                )));
            }
        }
        None => {
            let terminators = bytes.iter().filter(|b| **b == 0).count() as u64;
            if terminators != count || (count > 0 && bytes.last() != Some(&0)) {
                return Err(StoreError::InvalidPayload(format!(
                    "expected {count} NUL-terminated strings, found {terminators} terminators"
                )));
            }
        }
    }
    Ok(())
}

/// Smallest payload the descriptors admit: every element for fixed-size
/// kinds, one NUL per element for text.
fn min_payload_len(datatype: &Datatype, dataspace: &Dataspace) -> StoreResult<u64> {
    dataspace
        .byte_len(datatype.element_size().unwrap_or(1))
        .ok_or_else(|| overflow(dataspace))
}

fn overflow(dataspace: &Dataspace) -> StoreError {
    StoreError::InvalidPayload(format!("dataspace {:?} is too large to address", dataspace.dims()))
}

fn validate_attribute_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "attribute name must not be empty".into(),
        });
    }
    if name.contains('\0') {
        return Err(StoreError::InvalidName {
            name: name.to_string(),
            reason: "attribute name must not contain NUL".into(),
        });
    }
    Ok(())
}

/// Canonical form of an absolute node path: `/` or `/a/b` without trailing
/// or doubled slashes.
pub(crate) fn normalize_path(path: &str) -> StoreResult<String> {
    if !path.starts_with('/') {
        return Err(StoreError::InvalidName {
            name: path.to_string(),
            reason: "node paths must be absolute".into(),
        });
    }
    let mut out = String::with_capacity(path.len());
    for component in path.split('/').filter(|c| !c.is_empty()) {
        if component == "." || component == ".." {
            return Err(StoreError::InvalidName {
                name: path.to_string(),
                reason: format!("relative component {component:?}"),
            });
        }
        out.push('/');
        out.push_str(component);
    }
    if out.is_empty() {
        out.push('/');
    }
    Ok(out)
}

/// Split a normalized path into `(parent, leaf)`; `None` for the root.
fn split_parent(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    let leaf = &path[idx + 1..];
    if leaf.is_empty() {
        return None;
    }
    let parent = if idx == 0 { "/" } else { &path[..idx] };
    Some((parent, leaf))
}

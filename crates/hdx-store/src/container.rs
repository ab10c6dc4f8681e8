//! Container sessions.
//!
//! A [`Container`] owns the working set of one open container file. Nodes
//! handed out by the container share its backend; closing the container
//! invalidates all of them, along with every record handle opened through
//! them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hdx_types::NodeId;
use tracing::{debug, warn};

use crate::config::{AccessMode, ContainerConfig};
use crate::error::{StoreError, StoreResult};
use crate::file::{read_image, write_image};
use crate::memory::InMemoryBackend;
use crate::node::Node;
use crate::traits::NodeKind;

/// An open container session.
pub struct Container {
    /// `None` for anonymous in-memory containers.
    path: Option<PathBuf>,
    backend: Arc<InMemoryBackend>,
    mode: AccessMode,
    config: ContainerConfig,
    closed: bool,
}

impl Container {
    /// Create a new container file holding only the root node.
    ///
    /// Fails if a file already exists at `path`.
    pub fn create(path: impl AsRef<Path>, config: ContainerConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(StoreError::ContainerExists(path.to_path_buf()));
        }
        let container = Self {
            path: Some(path.to_path_buf()),
            backend: Arc::new(InMemoryBackend::new(&config)),
            mode: AccessMode::ReadWrite,
            config,
            closed: false,
        };
        container.flush()?;
        debug!(path = %path.display(), "container created");
        Ok(container)
    }

    /// Open an existing container file with the default configuration.
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> StoreResult<Self> {
        Self::open_with_config(path, mode, ContainerConfig::default())
    }

    /// Open an existing container file.
    ///
    /// Creation order tracking and the attribute size limit are properties
    /// of the file; only the session settings of `config` apply.
    pub fn open_with_config(
        path: impl AsRef<Path>,
        mode: AccessMode,
        config: ContainerConfig,
    ) -> StoreResult<Self> {
        let path = path.as_ref();
        let image = read_image(path)?;
        let backend = InMemoryBackend::from_image(image, mode == AccessMode::ReadOnly)?;
        debug!(path = %path.display(), ?mode, "container opened");
        Ok(Self {
            path: Some(path.to_path_buf()),
            backend: Arc::new(backend),
            mode,
            config,
            closed: false,
        })
    }

    /// An anonymous read-write container that is never persisted.
    pub fn in_memory(config: ContainerConfig) -> Self {
        Self {
            path: None,
            backend: Arc::new(InMemoryBackend::new(&config)),
            mode: AccessMode::ReadWrite,
            config,
            closed: false,
        }
    }

    /// The root node (`/`).
    pub fn root(&self) -> Node {
        Node::new(self.backend.clone(), NodeId::ROOT, "/")
    }

    /// Resolve an absolute node path.
    pub fn node(&self, path: &str) -> StoreResult<Node> {
        let id = self.backend.resolve(path)?;
        let path = self.backend.node_path(id)?;
        Ok(Node::new(self.backend.clone(), id, path))
    }

    /// Create a group at `path`. The parent must exist.
    pub fn create_group(&self, path: &str) -> StoreResult<Node> {
        self.create_node(path, NodeKind::Group)
    }

    /// Create a node of `kind` at `path`. The parent must exist.
    pub fn create_node(&self, path: &str, kind: NodeKind) -> StoreResult<Node> {
        let id = self.backend.create_node(path, kind)?;
        let path = self.backend.node_path(id)?;
        Ok(Node::new(self.backend.clone(), id, path))
    }

    /// Persist the current state. No-op for read-only and in-memory sessions.
    pub fn flush(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        match (&self.path, self.mode) {
            (Some(path), AccessMode::ReadWrite) => {
                let image = self.backend.to_image()?;
                write_image(path, &image, self.config.sync_mode)
            }
            _ => Ok(()),
        }
    }

    /// Flush and close. Every node and record handle derived from this
    /// container becomes invalid, even if the flush fails.
    pub fn close(mut self) -> StoreResult<()> {
        self.close_inner()
    }

    fn close_inner(&mut self) -> StoreResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.flush();
        self.closed = true;
        self.backend.invalidate();
        debug!(path = ?self.path, "container closed");
        result
    }

    pub fn is_open(&self) -> bool {
        !self.closed
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Number of record handles currently open in this session.
    pub fn open_record_count(&self) -> usize {
        self.backend.open_record_count()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if let Err(e) = self.close_inner() {
            warn!(path = ?self.path, error = %e, "failed to flush container on drop");
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Backend;
    use hdx_types::{Dataspace, Datatype, ScalarKind};

    const U8: Datatype = Datatype::Scalar(ScalarKind::U8);

    #[test]
    fn create_then_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hdx");

        let c = Container::create(&path, ContainerConfig::default()).unwrap();
        let g = c.create_group("/grp").unwrap();
        let backend = g.backend();
        let r = backend.create_record(g.id(), "flag", &U8, &Dataspace::Scalar).unwrap();
        backend.write_record(r, &U8, &[7]).unwrap();
        backend.close_record(r).unwrap();
        c.close().unwrap();

        let c = Container::open(&path, AccessMode::ReadOnly).unwrap();
        let g = c.node("/grp").unwrap();
        assert_eq!(g.path(), "/grp");
        let backend = g.backend();
        let r = backend.open_record(g.id(), "flag").unwrap();
        assert_eq!(backend.read_record(r, &U8).unwrap(), vec![7]);
    }

    #[test]
    fn create_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hdx");
        Container::create(&path, ContainerConfig::default()).unwrap().close().unwrap();
        assert!(matches!(
            Container::create(&path, ContainerConfig::default()),
            Err(StoreError::ContainerExists(_))
        ));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Container::open(dir.path().join("nope.hdx"), AccessMode::ReadWrite).is_err());
    }

    #[test]
    fn close_invalidates_nodes() {
        let c = Container::in_memory(ContainerConfig::default());
        let root = c.root();
        assert!(root.is_valid());
        c.close().unwrap();
        assert!(!root.is_valid());
    }

    #[test]
    fn drop_flushes_read_write_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hdx");
        {
            let c = Container::create(&path, ContainerConfig::default()).unwrap();
            c.create_group("/dropped").unwrap();
        }
        let c = Container::open(&path, AccessMode::ReadOnly).unwrap();
        assert!(c.node("/dropped").is_ok());
    }

    #[test]
    fn read_only_session_does_not_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hdx");
        Container::create(&path, ContainerConfig::default()).unwrap().close().unwrap();
        let before = std::fs::read(&path).unwrap();

        let c = Container::open(&path, AccessMode::ReadOnly).unwrap();
        assert!(matches!(c.create_group("/g"), Err(StoreError::ReadOnly)));
        c.close().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn creation_order_setting_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hdx");
        let config = ContainerConfig {
            track_creation_order: false,
            ..ContainerConfig::default()
        };
        Container::create(&path, config).unwrap().close().unwrap();

        let c = Container::open(&path, AccessMode::ReadOnly).unwrap();
        assert_eq!(c.root().backend().native_order(), crate::traits::IterOrder::Name);
    }

    #[test]
    fn size_limit_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.hdx");
        let config = ContainerConfig {
            max_attribute_size: 1024 * 1024,
            ..ContainerConfig::default()
        };
        Container::create(&path, config).unwrap().close().unwrap();

        let c = Container::open(&path, AccessMode::ReadWrite).unwrap();
        let root = c.root();
        let backend = root.backend();
        let space = Dataspace::vector(100 * 1024);
        let r = backend.create_record(root.id(), "big", &U8, &space).unwrap();
        backend.write_record(r, &U8, &vec![1; 100 * 1024]).unwrap();
        backend.close_record(r).unwrap();
    }

    #[test]
    fn flush_after_close_is_rejected() {
        let mut c = Container::in_memory(ContainerConfig::default());
        c.close_inner().unwrap();
        assert!(matches!(c.flush(), Err(StoreError::Closed)));
        assert!(!c.is_open());
    }
}

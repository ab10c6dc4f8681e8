use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Flush strategy for container images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` the image before it replaces the previous file.
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering.
    OsDefault,
}

/// How a container session may be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

/// Configuration for a container session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Enumerate attributes in creation order instead of name order.
    ///
    /// Only consulted when a container is created; existing containers keep
    /// the setting they were created with.
    pub track_creation_order: bool,
    /// Sync strategy used when the image is written.
    pub sync_mode: SyncMode,
    /// Largest payload a single attribute may hold, in bytes.
    ///
    /// Like `track_creation_order`, fixed when the container is created.
    pub max_attribute_size: u64,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            track_creation_order: true,
            sync_mode: SyncMode::default(),
            max_attribute_size: 64 * 1024, // 64 KiB
        }
    }
}

impl ContainerConfig {
    /// Parse a config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> StoreResult<Self> {
        toml::from_str(s).map_err(|e| StoreError::Config(e.to_string()))
    }
}

//! Single-file container images.
//!
//! On-disk format:
//! ```text
//! [4 bytes: magic "HDXC"]
//! [4 bytes: format version (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [8 bytes: payload length (little-endian u64)]
//! [N bytes: payload (bincode-serialized ContainerImage)]
//! ```
//!
//! Images are written to a temporary file in the target directory and
//! renamed over the target, so a crash leaves either the old or the new image.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use hdx_types::{Dataspace, Datatype};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};
use crate::traits::NodeKind;

const MAGIC: &[u8; 4] = b"HDXC";
const VERSION: u32 = 1;
/// Magic + version + CRC + payload length.
const HEADER_SIZE: usize = 20;

/// Serialized state of a whole container.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerImage {
    pub track_creation_order: bool,
    /// Payload limit the container was created with.
    pub max_attribute_size: u64,
    /// Every node, parents before children. The first entry is the root.
    pub nodes: Vec<NodeImage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeImage {
    pub path: String,
    pub kind: NodeKind,
    /// Attributes in creation order.
    pub attributes: Vec<AttributeImage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeImage {
    pub name: String,
    pub datatype: Datatype,
    pub dataspace: Dataspace,
    /// `None` until the first write.
    pub data: Option<Vec<u8>>,
}

/// Atomically replace the file at `path` with `image`.
pub fn write_image(path: &Path, image: &ContainerImage, sync_mode: SyncMode) -> StoreResult<()> {
    let payload =
        bincode::serialize(image).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        w.write_all(MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;
        w.write_all(&crc.to_le_bytes())?;
        w.write_all(&(payload.len() as u64).to_le_bytes())?;
        w.write_all(&payload)?;
        w.flush()?;
    }
    if matches!(sync_mode, SyncMode::EveryWrite) {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    debug!(path = %path.display(), len = payload.len(), nodes = image.nodes.len(), "container image written");
    Ok(())
}

/// Load and validate the image at `path`.
pub fn read_image(path: &Path) -> StoreResult<ContainerImage> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;

    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Corrupt(format!(
            "file is {} bytes, shorter than the {HEADER_SIZE} byte header",
            bytes.len()
        )));
    }
    if &bytes[..4] != MAGIC {
        return Err(StoreError::Corrupt("bad magic".into()));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != VERSION {
        return Err(StoreError::Corrupt(format!("unsupported format version {version}")));
    }
    let expected_crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    let mut len_buf = [0u8; 8];
    len_buf.copy_from_slice(&bytes[12..HEADER_SIZE]);
    let length = u64::from_le_bytes(len_buf);

    let payload = &bytes[HEADER_SIZE..];
    if payload.len() as u64 != length {
        return Err(StoreError::Corrupt(format!(
            "payload is {} bytes, header says {length}",
            payload.len()
        )));
    }
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(StoreError::Corrupt(format!(
            "CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"
        )));
    }

    let image: ContainerImage =
        bincode::deserialize(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
    if image.nodes.first().map(|n| n.kind) != Some(NodeKind::Root) {
        return Err(StoreError::Corrupt("image has no root node".into()));
    }
    debug!(path = %path.display(), nodes = image.nodes.len(), "container image loaded");
    Ok(image)
}

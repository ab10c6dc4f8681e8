//! One-call helpers that open a container, touch one node and close it.

use std::collections::BTreeMap;
use std::path::Path;

use hdx_store::{AccessMode, Container};
use hdx_types::Value;
use tracing::debug;

use crate::error::{AttrError, AttrResult};
use crate::ops::finish;
use crate::view::{attributes, Attributes};

/// Open `container_path` read-write and `set` every pair on `node_path`.
///
/// The container is closed on every path. A close failure is only reported
/// when the writes succeeded.
pub fn write_all_attributes<P, I, K, V>(
    container_path: P,
    node_path: &str,
    pairs: I,
) -> AttrResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let container = Container::open(container_path.as_ref(), AccessMode::ReadWrite)?;
    let result = node_view(&container, node_path).and_then(|attrs| attrs.extend(pairs));
    debug!(
        path = %container_path.as_ref().display(),
        node = node_path,
        ok = result.is_ok(),
        "bulk write finished"
    );
    finish(result, container.close().map_err(AttrError::from))
}

/// Open `container_path` read-only and read every attribute of `node_path`.
pub fn read_all_attributes(
    container_path: impl AsRef<Path>,
    node_path: &str,
) -> AttrResult<BTreeMap<String, Value>> {
    let container = Container::open(container_path.as_ref(), AccessMode::ReadOnly)?;
    let result = node_view(&container, node_path).and_then(|attrs| attrs.to_map());
    finish(result, container.close().map_err(AttrError::from))
}

fn node_view(container: &Container, node_path: &str) -> AttrResult<Attributes> {
    Ok(attributes(&container.node(node_path)?))
}

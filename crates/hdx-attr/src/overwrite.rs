//! Replacing an existing attribute.
//!
//! Attributes cannot change datatype or shape in place, so an overwrite
//! writes the new value under a temporary name, deletes the original and
//! renames the temporary into place. The temporary is removed on every exit
//! path.

use hdx_store::Node;
use hdx_types::Value;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::OverwriteConfig;
use crate::error::{AttrError, AttrResult};
use crate::ops::{attribute_exists, delete_attribute, rename_attribute, write_attribute};

/// Draw a temporary attribute name that is free on `parent`.
pub(crate) fn temp_name(parent: &Node, config: &OverwriteConfig) -> AttrResult<String> {
    let mut rng = rand::thread_rng();
    for _ in 0..config.max_attempts {
        let suffix: [u8; 8] = rng.gen();
        let candidate = format!("{}{}", config.temp_prefix, hex::encode(suffix));
        if !attribute_exists(parent, &candidate)? {
            return Ok(candidate);
        }
    }
    Err(AttrError::TempNameExhausted {
        attempts: config.max_attempts,
    })
}

/// Replace the existing attribute `name` with `value`.
///
/// If the original was deleted but the rename into place failed, `name` is
/// left absent and the rename error is returned.
pub fn overwrite_attribute(
    parent: &Node,
    name: &str,
    value: &Value,
    config: &OverwriteConfig,
) -> AttrResult<()> {
    let temp = temp_name(parent, config)?;
    debug!(node = %parent.path(), name, temp = %temp, "overwriting attribute");
    let result = replace_via(parent, name, &temp, value);
    cleanup_temp(parent, &temp);
    result
}

fn replace_via(parent: &Node, name: &str, temp: &str, value: &Value) -> AttrResult<()> {
    write_attribute(parent, temp, value)?;
    delete_attribute(parent, name)?;
    rename_attribute(parent, temp, name)
}

fn cleanup_temp(parent: &Node, temp: &str) {
    let outcome = attribute_exists(parent, temp).and_then(|exists| {
        if exists {
            delete_attribute(parent, temp).map(|()| true)
        } else {
            Ok(false)
        }
    });
    match outcome {
        Ok(true) => debug!(node = %parent.path(), temp, "removed temporary attribute"),
        Ok(false) => {}
        Err(e) => warn!(
            node = %parent.path(),
            temp,
            error = %e,
            "failed to remove temporary attribute"
        ),
    }
}

/// Write `value` under `name`, replacing any existing attribute.
pub fn set_attribute(
    parent: &Node,
    name: &str,
    value: &Value,
    config: &OverwriteConfig,
) -> AttrResult<()> {
    if attribute_exists(parent, name)? {
        overwrite_attribute(parent, name, value, config)
    } else {
        write_attribute(parent, name, value)
    }
}

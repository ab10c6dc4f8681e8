//! Attribute API for HDX containers.
//!
//! Attributes are small named values attached to container nodes. This crate
//! layers three things over the record primitives of `hdx-store`:
//!
//! - lifecycle operations (open, create, read, write, rename, delete) that
//!   release every handle they open, on every exit path;
//! - a safe overwrite that replaces an attribute whose datatype or shape
//!   changes, going through a temporary name;
//! - a dictionary-style view ([`Attributes`]) and bulk helpers that work on a
//!   whole container file in one call.
//!
//! # Key Types
//!
//! - [`AttributeHandle`] -- An open attribute record
//! - [`Attributes`] -- Map-like view over one node's attributes
//! - [`AttributeMap`] -- The operations of that view
//! - [`AttrError`] -- Error type for every operation here

pub mod bulk;
pub mod config;
pub mod error;
pub mod handle;
pub mod ops;
pub mod overwrite;
pub mod view;

#[cfg(test)]
mod testing;

pub use bulk::{read_all_attributes, write_all_attributes};
pub use config::OverwriteConfig;
pub use error::{AttrError, AttrResult};
pub use handle::AttributeHandle;
pub use ops::{
    attribute_count, attribute_exists, attribute_info, create_attribute,
    create_attribute_from_value, delete_attribute, open_attribute, read, read_attribute,
    rename_attribute, write, write_attribute, AttributeInfo,
};
pub use overwrite::{overwrite_attribute, set_attribute};
pub use view::{attributes, AttributeIter, AttributeMap, Attributes};

// Re-export the types callers need alongside the API.
pub use hdx_store::{AccessMode, Container, ContainerConfig, Node, NodeKind};
pub use hdx_types::{Dataspace, Datatype, ScalarKind, Value};

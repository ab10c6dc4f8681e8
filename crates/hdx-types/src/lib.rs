//! Foundation types for HDX containers.
//!
//! This crate provides the identifiers, descriptors and payload types shared
//! by the storage backend (`hdx-store`) and the attribute layer (`hdx-attr`).
//!
//! # Key Types
//!
//! - [`RecordId`] -- Backend id of an open attribute record, with an invalid sentinel
//! - [`NodeId`] -- Backend id of a node (root, group, dataset, named type)
//! - [`Datatype`] / [`ScalarKind`] -- How a record's bytes are interpreted
//! - [`Dataspace`] -- Shape of a record's payload
//! - [`Value`] -- Tagged attribute payload with datatype/dataspace inference

pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod id;
pub mod value;

pub use dataspace::Dataspace;
pub use datatype::{Datatype, ScalarKind};
pub use error::TypeError;
pub use id::{NodeId, RecordId};
pub use value::{decode_text, encode_text, ArrayValue, Element, Scalar, Value};

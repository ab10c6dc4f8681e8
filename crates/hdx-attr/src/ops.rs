//! Attribute lifecycle operations.
//!
//! Every composite operation here releases the handles it opens on every
//! exit path. Failures during that release never replace the error being
//! returned; they are logged instead.

use std::borrow::Cow;

use hdx_store::{Node, RecordInfo};
use hdx_types::{encode_text, Dataspace, Datatype, Value};
use tracing::{debug, warn};

use crate::error::{AttrError, AttrResult};
use crate::handle::{ensure_live, AttributeHandle};

/// Descriptors of a stored attribute.
pub type AttributeInfo = RecordInfo;

/// Combine a primary result with the result of a cleanup step.
///
/// The primary error wins; a cleanup error only surfaces when the primary
/// step succeeded.
pub(crate) fn finish<T>(result: AttrResult<T>, cleanup: AttrResult<()>) -> AttrResult<T> {
    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(error = %cleanup_err, "cleanup failed while propagating an earlier error");
            Err(e)
        }
    }
}

/// Open the existing attribute `name` on `parent`.
pub fn open_attribute(parent: &Node, name: &str) -> AttrResult<AttributeHandle> {
    AttributeHandle::open(parent, name)
}

/// Create an attribute with explicit descriptors. Writes no payload.
pub fn create_attribute(
    parent: &Node,
    name: &str,
    datatype: &Datatype,
    dataspace: &Dataspace,
) -> AttrResult<AttributeHandle> {
    AttributeHandle::create(parent, name, datatype, dataspace)
}

/// Create an attribute shaped for `value`. Writes no payload.
///
/// Returns the open handle and the inferred datatype for the write that
/// follows.
pub fn create_attribute_from_value(
    parent: &Node,
    name: &str,
    value: &Value,
) -> AttrResult<(AttributeHandle, Datatype)> {
    let datatype = value.datatype();
    let dataspace = value.dataspace();
    let handle = create_attribute(parent, name, &datatype, &dataspace)?;
    Ok((handle, datatype))
}

/// Read an open attribute using its own stored datatype.
pub fn read(handle: &AttributeHandle) -> AttrResult<Value> {
    let id = handle.live_id()?;
    let backend = handle.backend();
    let info = backend.record_info(id)?;
    let bytes = backend.read_record(id, &info.datatype)?;
    Ok(Value::decode(info.datatype, &info.dataspace, &bytes)?)
}

/// Open, read and close the attribute `name` on `parent`.
pub fn read_attribute(parent: &Node, name: &str) -> AttrResult<Value> {
    let mut handle = open_attribute(parent, name)?;
    let result = read(&handle);
    finish(result, handle.close())
}

/// Write `value` into an open attribute.
///
/// Zero-element payloads are not sent to the backend.
pub fn write(handle: &AttributeHandle, datatype: &Datatype, value: &Value) -> AttrResult<()> {
    let id = handle.live_id()?;
    let payload: Cow<'_, [u8]> = match value {
        Value::Text(s) => {
            let mut buf = Vec::with_capacity(s.len() + 1);
            encode_text(s, &mut buf)?;
            Cow::Owned(buf)
        }
        Value::Scalar(scalar) => Cow::Owned(scalar.to_le_bytes()),
        Value::TextArray(items) if items.is_empty() => return Ok(()),
        Value::TextArray(items) => {
            let mut buf = Vec::with_capacity(items.iter().map(|s| s.len() + 1).sum());
            for item in items {
                encode_text(item, &mut buf)?;
            }
            Cow::Owned(buf)
        }
        Value::Empty(_) => return Ok(()),
        Value::Array(array) if array.is_empty() => return Ok(()),
        Value::Array(array) => Cow::Borrowed(array.as_bytes()),
    };
    handle.backend().write_record(id, datatype, &payload)?;
    Ok(())
}

/// Create the attribute `name` on `parent` and write `value` into it.
///
/// If the write fails the half-created attribute is deleted before the
/// write error is returned, so no payload-less attribute is left behind.
pub fn write_attribute(parent: &Node, name: &str, value: &Value) -> AttrResult<()> {
    let (mut handle, datatype) = create_attribute_from_value(parent, name, value)?;
    match write(&handle, &datatype, value) {
        Ok(()) => handle.close(),
        Err(e) => {
            if let Err(close_err) = handle.close() {
                warn!(name, error = %close_err, "failed to close attribute after write error");
            }
            match delete_attribute(parent, name) {
                Ok(()) => debug!(node = %parent.path(), name, "removed half-created attribute"),
                Err(delete_err) => warn!(
                    node = %parent.path(),
                    name,
                    error = %delete_err,
                    "failed to remove half-created attribute"
                ),
            }
            Err(e)
        }
    }
}

/// Rename an attribute on `parent`.
pub fn rename_attribute(parent: &Node, old_name: &str, new_name: &str) -> AttrResult<()> {
    ensure_live(parent)?;
    parent.backend().rename_record(parent.id(), old_name, new_name)?;
    Ok(())
}

/// Delete an attribute from `parent`.
pub fn delete_attribute(parent: &Node, name: &str) -> AttrResult<()> {
    ensure_live(parent)?;
    parent.backend().delete_record(parent.id(), name)?;
    Ok(())
}

/// Returns `true` if `parent` has an attribute named `name`.
pub fn attribute_exists(parent: &Node, name: &str) -> AttrResult<bool> {
    ensure_live(parent)?;
    Ok(parent.backend().record_exists(parent.id(), name)?)
}

/// Number of attributes on `parent`.
pub fn attribute_count(parent: &Node) -> AttrResult<usize> {
    ensure_live(parent)?;
    Ok(parent.info()?.attribute_count)
}

/// Descriptors of the attribute `name` on `parent`.
pub fn attribute_info(parent: &Node, name: &str) -> AttrResult<AttributeInfo> {
    let mut handle = open_attribute(parent, name)?;
    let result = handle.info();
    finish(result, handle.close())
}

/// Map a `NotFound` from a keyed lookup to `KeyNotFound`.
pub(crate) fn key_not_found(err: AttrError) -> AttrError {
    match err {
        AttrError::NotFound(name) => AttrError::KeyNotFound(name),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{faulty_root, Fault};
    use hdx_store::{Container, ContainerConfig, StoreError};
    use hdx_types::{ArrayValue, Scalar, ScalarKind};

    fn container() -> Container {
        Container::in_memory(ContainerConfig::default())
    }

    fn roundtrip(value: Value) {
        let c = container();
        let root = c.root();
        write_attribute(&root, "v", &value).unwrap();
        assert_eq!(read_attribute(&root, "v").unwrap(), value);
        assert_eq!(c.open_record_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Round trips per payload shape
    // -----------------------------------------------------------------------

    #[test]
    fn roundtrip_scalar_number() {
        roundtrip(Value::from(3i64));
        roundtrip(Value::from(-1.25f32));
        roundtrip(Value::Scalar(Scalar::C64(1.0, -0.5)));
    }

    #[test]
    fn roundtrip_scalar_string() {
        roundtrip(Value::from("hello"));
        roundtrip(Value::from(""));
    }

    #[test]
    fn roundtrip_numeric_array() {
        roundtrip(Value::from(vec![1u16, 2, 3]));
        let matrix = ArrayValue::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0])
            .reshape(vec![2, 3])
            .unwrap();
        roundtrip(Value::Array(matrix));
    }

    #[test]
    fn roundtrip_string_array() {
        roundtrip(Value::text_array(["a", "", "ccc"]));
    }

    #[test]
    fn roundtrip_empty_arrays() {
        roundtrip(Value::from(Vec::<i32>::new()));
        roundtrip(Value::from(Vec::<String>::new()));
    }

    #[test]
    fn empty_payload_is_not_written() {
        let c = container();
        let root = c.root();
        write_attribute(&root, "e", &Value::Empty(Datatype::Scalar(ScalarKind::F64))).unwrap();
        let info = attribute_info(&root, "e").unwrap();
        assert_eq!(info.storage_size, 0);
        assert_eq!(info.dataspace, Dataspace::vector(0));
    }

    // -----------------------------------------------------------------------
    // Composite operations
    // -----------------------------------------------------------------------

    #[test]
    fn create_from_value_writes_nothing() {
        let c = container();
        let root = c.root();
        let (mut handle, datatype) =
            create_attribute_from_value(&root, "n", &Value::from(vec![7i32, 8])).unwrap();
        assert_eq!(datatype, Datatype::Scalar(ScalarKind::I32));
        assert_eq!(handle.dataspace().unwrap(), Dataspace::vector(2));
        assert_eq!(read(&handle).unwrap(), Value::from(vec![0i32, 0]));
        write(&handle, &datatype, &Value::from(vec![7i32, 8])).unwrap();
        assert_eq!(read(&handle).unwrap(), Value::from(vec![7i32, 8]));
        handle.close().unwrap();
    }

    #[test]
    fn write_attribute_existing_name_fails() {
        let c = container();
        let root = c.root();
        write_attribute(&root, "a", &Value::from(1i64)).unwrap();
        let err = write_attribute(&root, "a", &Value::from(2i64)).unwrap_err();
        assert!(matches!(err, AttrError::AlreadyExists(_)));
        assert_eq!(read_attribute(&root, "a").unwrap(), Value::from(1i64));
    }

    #[test]
    fn failed_write_leaves_no_orphan() {
        let (backend, root) = faulty_root();
        backend.arm(Fault::Write);
        let err = write_attribute(&root, "a", &Value::from(1i64)).unwrap_err();
        assert!(matches!(err, AttrError::Store(StoreError::Io(_))));
        assert!(!attribute_exists(&root, "a").unwrap());
        assert_eq!(attribute_count(&root).unwrap(), 0);
        assert_eq!(backend.inner().open_record_count(), 0);
    }

    #[test]
    fn failed_read_releases_handle() {
        let (backend, root) = faulty_root();
        write_attribute(&root, "a", &Value::from(1i64)).unwrap();
        backend.arm(Fault::Read);
        let err = read_attribute(&root, "a").unwrap_err();
        assert!(matches!(err, AttrError::Store(StoreError::Io(_))));
        assert_eq!(backend.inner().open_record_count(), 0);
        assert_eq!(read_attribute(&root, "a").unwrap(), Value::from(1i64));
    }

    #[test]
    fn oversized_or_overflowing_dataspace_is_rejected() {
        let c = container();
        let root = c.root();
        let i64_type = Datatype::Scalar(ScalarKind::I64);
        write_attribute(&root, "ok", &Value::from(1i64)).unwrap();

        let err = create_attribute(&root, "big", &i64_type, &Dataspace::Simple(vec![1 << 62, 8]))
            .unwrap_err();
        assert!(matches!(err, AttrError::Store(StoreError::InvalidPayload(_))));
        let err = create_attribute(&root, "big", &i64_type, &Dataspace::vector(1 << 40))
            .unwrap_err();
        assert!(matches!(err, AttrError::Store(StoreError::TooLarge { .. })));

        assert!(!attribute_exists(&root, "big").unwrap());
        assert_eq!(read_attribute(&root, "ok").unwrap(), Value::from(1i64));
        assert_eq!(c.open_record_count(), 0);
    }

    #[test]
    fn zero_element_shapes_roundtrip() {
        let shaped = ArrayValue::new(ScalarKind::F64, vec![2, 0], vec![]).unwrap();
        roundtrip(Value::Array(shaped));
        roundtrip(Value::TextArray(vec![]));
        roundtrip(Value::Array(ArrayValue::new(ScalarKind::I8, vec![0], vec![]).unwrap()));
    }

    #[test]
    fn interior_nul_fails_and_rolls_back() {
        let c = container();
        let root = c.root();
        let err = write_attribute(&root, "s", &Value::from("a\0b")).unwrap_err();
        assert!(matches!(err, AttrError::Type(_)));
        assert!(!attribute_exists(&root, "s").unwrap());
    }

    #[test]
    fn read_missing_is_not_found() {
        let c = container();
        assert!(matches!(
            read_attribute(&c.root(), "missing"),
            Err(AttrError::NotFound(_))
        ));
    }

    #[test]
    fn read_closed_handle_is_invalid() {
        let c = container();
        let root = c.root();
        write_attribute(&root, "a", &Value::from(1u8)).unwrap();
        let mut h = open_attribute(&root, "a").unwrap();
        h.close().unwrap();
        assert!(matches!(read(&h), Err(AttrError::Invalid(_))));
        assert!(matches!(
            write(&h, &Datatype::Scalar(ScalarKind::U8), &Value::from(2u8)),
            Err(AttrError::Invalid(_))
        ));
    }

    #[test]
    fn rename_law() {
        let c = container();
        let root = c.root();
        write_attribute(&root, "a", &Value::from("payload")).unwrap();
        rename_attribute(&root, "a", "b").unwrap();
        assert!(!attribute_exists(&root, "a").unwrap());
        assert!(attribute_exists(&root, "b").unwrap());
        assert_eq!(read_attribute(&root, "b").unwrap(), Value::from("payload"));
    }

    #[test]
    fn rename_missing_and_collision() {
        let c = container();
        let root = c.root();
        assert!(matches!(
            rename_attribute(&root, "x", "y"),
            Err(AttrError::NotFound(_))
        ));
        write_attribute(&root, "a", &Value::from(1i8)).unwrap();
        write_attribute(&root, "b", &Value::from(2i8)).unwrap();
        assert!(matches!(
            rename_attribute(&root, "a", "b"),
            Err(AttrError::AlreadyExists(_))
        ));
    }

    #[test]
    fn delete_law() {
        let c = container();
        let root = c.root();
        write_attribute(&root, "a", &Value::from(1i64)).unwrap();
        assert_eq!(attribute_count(&root).unwrap(), 1);
        delete_attribute(&root, "a").unwrap();
        assert!(!attribute_exists(&root, "a").unwrap());
        assert_eq!(attribute_count(&root).unwrap(), 0);
        assert!(matches!(
            delete_attribute(&root, "a"),
            Err(AttrError::NotFound(_))
        ));
    }

    #[test]
    fn operations_on_closed_container_are_invalid() {
        let c = container();
        let root = c.root();
        write_attribute(&root, "a", &Value::from(1i64)).unwrap();
        c.close().unwrap();
        assert!(matches!(read_attribute(&root, "a"), Err(AttrError::Invalid(_))));
        assert!(matches!(
            write_attribute(&root, "b", &Value::from(1i64)),
            Err(AttrError::Invalid(_))
        ));
        assert!(matches!(rename_attribute(&root, "a", "b"), Err(AttrError::Invalid(_))));
        assert!(matches!(delete_attribute(&root, "a"), Err(AttrError::Invalid(_))));
        assert!(matches!(attribute_exists(&root, "a"), Err(AttrError::Invalid(_))));
        assert!(matches!(attribute_count(&root), Err(AttrError::Invalid(_))));
    }

    #[test]
    fn attributes_on_group_nodes() {
        let c = container();
        let g = c.create_group("/g").unwrap();
        write_attribute(&g, "units", &Value::from("m/s")).unwrap();
        assert!(!attribute_exists(&c.root(), "units").unwrap());
        assert_eq!(read_attribute(&g, "units").unwrap(), Value::from("m/s"));
    }

    #[test]
    fn finish_prefers_primary_error() {
        let primary: AttrResult<()> = Err(AttrError::KeyNotFound("k".into()));
        let cleanup: AttrResult<()> = Err(AttrError::Invalid("x".into()));
        assert!(matches!(finish(primary, cleanup), Err(AttrError::KeyNotFound(_))));
        let ok: AttrResult<u8> = Ok(1);
        assert!(matches!(
            finish(ok, Err(AttrError::Invalid("x".into()))),
            Err(AttrError::Invalid(_))
        ));
    }
}

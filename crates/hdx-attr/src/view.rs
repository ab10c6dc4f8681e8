//! Dictionary-style access to the attributes of one node.
//!
//! [`Attributes`] holds only the parent [`Node`]. Every call re-validates it,
//! so a view that outlives its container fails with `Invalid` instead of
//! touching dead ids.

use std::collections::BTreeMap;

use hdx_store::Node;
use hdx_types::Value;

use crate::config::OverwriteConfig;
use crate::error::{AttrError, AttrResult};
use crate::handle::ensure_live;
use crate::ops::{
    attribute_count, attribute_exists, attribute_info, delete_attribute, key_not_found,
    read_attribute, rename_attribute, AttributeInfo,
};
use crate::overwrite::set_attribute;

/// Map-like operations over a node's attributes.
pub trait AttributeMap {
    /// Iterator over `(name, value)` pairs.
    type Iter: Iterator<Item = AttrResult<(String, Value)>>;

    fn contains(&self, name: &str) -> AttrResult<bool>;

    fn len(&self) -> AttrResult<usize>;

    fn is_empty(&self) -> AttrResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read `name`; `KeyNotFound` if it does not exist.
    fn get(&self, name: &str) -> AttrResult<Value>;

    /// Read `name`, or return `default` if it does not exist.
    fn get_or(&self, name: &str, default: Value) -> AttrResult<Value> {
        match self.get(name) {
            Err(AttrError::KeyNotFound(_)) => Ok(default),
            other => other,
        }
    }

    /// Create or replace `name`.
    fn set(&self, name: &str, value: &Value) -> AttrResult<()>;

    fn remove(&self, name: &str) -> AttrResult<()>;

    /// All names in the container's native order.
    fn keys(&self) -> AttrResult<Vec<String>>;

    /// Pairs for a snapshot of the current keys, read lazily.
    fn iter(&self) -> AttrResult<Self::Iter>;
}

/// The attribute view of `node`.
pub fn attributes(node: &Node) -> Attributes {
    Attributes::new(node.clone())
}

/// Attribute view of a single node.
#[derive(Clone, Debug)]
pub struct Attributes {
    node: Node,
    overwrite: OverwriteConfig,
}

impl Attributes {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            overwrite: OverwriteConfig::default(),
        }
    }

    /// Use `config` for overwrites issued by `set`.
    pub fn with_overwrite_config(mut self, config: OverwriteConfig) -> Self {
        self.overwrite = config;
        self
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Descriptors of `name`; `KeyNotFound` if it does not exist.
    pub fn info(&self, name: &str) -> AttrResult<AttributeInfo> {
        attribute_info(&self.node, name).map_err(key_not_found)
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> AttrResult<()> {
        rename_attribute(&self.node, old_name, new_name)
    }

    /// `set` every pair in order, stopping at the first failure.
    pub fn extend<I, K, V>(&self, pairs: I) -> AttrResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in pairs {
            self.set(name.as_ref(), &value.into())?;
        }
        Ok(())
    }

    /// Read every attribute into a name-ordered map.
    pub fn to_map(&self) -> AttrResult<BTreeMap<String, Value>> {
        self.iter()?.collect()
    }
}

impl AttributeMap for Attributes {
    type Iter = AttributeIter;

    fn contains(&self, name: &str) -> AttrResult<bool> {
        attribute_exists(&self.node, name)
    }

    fn len(&self) -> AttrResult<usize> {
        attribute_count(&self.node)
    }

    fn get(&self, name: &str) -> AttrResult<Value> {
        read_attribute(&self.node, name).map_err(key_not_found)
    }

    fn set(&self, name: &str, value: &Value) -> AttrResult<()> {
        set_attribute(&self.node, name, value, &self.overwrite)
    }

    fn remove(&self, name: &str) -> AttrResult<()> {
        delete_attribute(&self.node, name)
    }

    fn keys(&self) -> AttrResult<Vec<String>> {
        ensure_live(&self.node)?;
        let backend = self.node.backend();
        let mut keys = Vec::with_capacity(self.len()?);
        backend.visit_names(self.node.id(), backend.native_order(), &mut |name: &str| {
            keys.push(name.to_owned())
        })?;
        Ok(keys)
    }

    fn iter(&self) -> AttrResult<AttributeIter> {
        Ok(AttributeIter {
            node: self.node.clone(),
            keys: self.keys()?.into_iter(),
        })
    }
}

/// Lazy `(name, value)` iterator over a key snapshot.
///
/// A key removed after the snapshot was taken yields `KeyNotFound`.
#[derive(Debug)]
pub struct AttributeIter {
    node: Node,
    keys: std::vec::IntoIter<String>,
}

impl Iterator for AttributeIter {
    type Item = AttrResult<(String, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.keys.next()?;
        Some(
            read_attribute(&self.node, &name)
                .map_err(key_not_found)
                .map(|value| (name, value)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

impl ExactSizeIterator for AttributeIter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{faulty_root, Fault};
    use hdx_store::{Container, ContainerConfig};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn container() -> Container {
        Container::in_memory(ContainerConfig::default())
    }

    #[test]
    fn empty_view() {
        let c = container();
        let attrs = attributes(&c.root());
        assert!(attrs.is_empty().unwrap());
        assert!(attrs.keys().unwrap().is_empty());
        assert_eq!(attrs.iter().unwrap().len(), 0);
    }

    #[test]
    fn set_get_contains() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.set("a", &Value::from(1i64)).unwrap();
        assert!(attrs.contains("a").unwrap());
        assert_eq!(attrs.len().unwrap(), 1);
        assert_eq!(attrs.get("a").unwrap(), Value::from(1i64));
    }

    #[test]
    fn get_missing_is_key_not_found() {
        let c = container();
        let attrs = attributes(&c.root());
        assert!(matches!(attrs.get("nope"), Err(AttrError::KeyNotFound(_))));
        assert!(matches!(attrs.info("nope"), Err(AttrError::KeyNotFound(_))));
        assert_eq!(
            attrs.get_or("nope", Value::from("fallback")).unwrap(),
            Value::from("fallback")
        );
    }

    #[test]
    fn keys_follow_creation_order() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.extend([("z", 1i32), ("a", 2), ("m", 3)]).unwrap();
        assert_eq!(attrs.keys().unwrap(), vec!["z", "a", "m"]);
    }

    #[test]
    fn keys_follow_name_order_without_tracking() {
        let c = Container::in_memory(ContainerConfig {
            track_creation_order: false,
            ..ContainerConfig::default()
        });
        let attrs = attributes(&c.root());
        attrs.extend([("z", 1i32), ("a", 2), ("m", 3)]).unwrap();
        assert_eq!(attrs.keys().unwrap(), vec!["a", "m", "z"]);
    }

    #[test]
    fn iterate_matches_get() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.set("n", &Value::from(vec![1u8, 2, 3])).unwrap();
        attrs.set("s", &Value::from("text")).unwrap();
        attrs.set("t", &Value::text_array(["x", "y"])).unwrap();

        let iter = attrs.iter().unwrap();
        assert_eq!(iter.len(), 3);
        let pairs: Vec<_> = iter.map(Result::unwrap).collect();
        assert_eq!(pairs.len(), attrs.len().unwrap());
        for (name, value) in pairs {
            assert_eq!(attrs.get(&name).unwrap(), value);
        }
    }

    #[test]
    fn key_removed_after_snapshot() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.extend([("a", 1i64), ("b", 2)]).unwrap();
        let mut iter = attrs.iter().unwrap();
        attrs.remove("a").unwrap();
        assert!(matches!(iter.next(), Some(Err(AttrError::KeyNotFound(_)))));
        assert_eq!(iter.next().unwrap().unwrap(), ("b".to_string(), Value::from(2i64)));
        assert!(iter.next().is_none());
    }

    #[test]
    fn failed_read_during_iteration_releases_handle() {
        let (backend, root) = faulty_root();
        let attrs = attributes(&root);
        attrs.extend([("a", 1i64), ("b", 2)]).unwrap();
        let mut iter = attrs.iter().unwrap();
        backend.arm(Fault::Read);
        assert!(matches!(iter.next(), Some(Err(AttrError::Store(_)))));
        assert_eq!(backend.inner().open_record_count(), 0);
        assert_eq!(iter.next().unwrap().unwrap(), ("b".to_string(), Value::from(2i64)));
    }

    #[test]
    fn remove_and_rename() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.set("a", &Value::from(1.0f64)).unwrap();
        attrs.rename("a", "b").unwrap();
        assert!(!attrs.contains("a").unwrap());
        assert_eq!(attrs.get("b").unwrap(), Value::from(1.0f64));
        attrs.remove("b").unwrap();
        assert!(matches!(attrs.get("b"), Err(AttrError::KeyNotFound(_))));
        assert!(matches!(attrs.remove("b"), Err(AttrError::NotFound(_))));
    }

    #[test]
    fn overwrite_through_view() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.set("version", &Value::from(3i64)).unwrap();
        attrs.set("version", &Value::from(4i64)).unwrap();
        assert_eq!(attrs.len().unwrap(), 1);
        assert_eq!(attrs.get("version").unwrap(), Value::from(4i64));
    }

    #[test]
    fn custom_overwrite_prefix() {
        let c = container();
        let attrs = attributes(&c.root()).with_overwrite_config(OverwriteConfig {
            temp_prefix: "~tmp~".into(),
            ..OverwriteConfig::default()
        });
        attrs.set("a", &Value::from(1u32)).unwrap();
        attrs.set("a", &Value::from(2u32)).unwrap();
        assert_eq!(attrs.keys().unwrap(), vec!["a"]);
    }

    #[test]
    fn to_map_is_name_ordered() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.extend([("b", "2"), ("a", "1")]).unwrap();
        let map = attrs.to_map().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map["a"], Value::from("1"));
    }

    #[test]
    fn view_after_close_is_invalid() {
        let c = container();
        let attrs = attributes(&c.root());
        attrs.set("a", &Value::from(1i64)).unwrap();
        c.close().unwrap();
        assert!(matches!(attrs.len(), Err(AttrError::Invalid(_))));
        assert!(matches!(attrs.keys(), Err(AttrError::Invalid(_))));
        assert!(matches!(attrs.get("a"), Err(AttrError::Invalid(_))));
        assert!(matches!(attrs.iter(), Err(AttrError::Invalid(_))));
    }

    proptest! {
        /// keys() is exactly the set of names contains() accepts.
        #[test]
        fn prop_keys_match_contains(
            names in prop::collection::vec("[a-e]{1,2}", 0..16),
            removals in prop::collection::vec("[a-e]{1,2}", 0..6),
        ) {
            let c = container();
            let attrs = attributes(&c.root());
            let mut expected = BTreeSet::new();
            for (i, name) in names.iter().enumerate() {
                attrs.set(name, &Value::from(i as u64)).unwrap();
                expected.insert(name.clone());
            }
            for name in &removals {
                if expected.remove(name) {
                    attrs.remove(name).unwrap();
                }
            }

            let keys = attrs.keys().unwrap();
            let unique: BTreeSet<String> = keys.iter().cloned().collect();
            prop_assert_eq!(unique.len(), keys.len());
            prop_assert_eq!(keys.len(), attrs.len().unwrap());
            prop_assert_eq!(&unique, &expected);
            for name in &keys {
                prop_assert!(attrs.contains(name).unwrap());
            }
            prop_assert_eq!(c.open_record_count(), 0);
        }
    }
}

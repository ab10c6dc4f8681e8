use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend identifier for one open attribute record.
///
/// Backends hand out non-zero ids. `RecordId::INVALID` (zero) is the sentinel
/// carried by closed handles and must never reach a backend primitive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// The sentinel id of a closed or never-opened handle.
    pub const INVALID: Self = Self(0);

    /// Wrap a raw backend id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw backend id.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns `true` unless this is the sentinel.
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "RecordId({})", self.0)
        } else {
            write!(f, "RecordId(INVALID)")
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Backend identifier for a node (root, group, dataset or named type).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    /// The container root (`/`).
    pub const ROOT: Self = Self(0);

    /// Wrap a raw backend id.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw backend id.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns `true` for the container root.
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_sentinel_is_zero() {
        assert!(!RecordId::INVALID.is_valid());
        assert_eq!(RecordId::INVALID.as_raw(), 0);
        assert_eq!(RecordId::default(), RecordId::INVALID);
    }

    #[test]
    fn nonzero_record_is_valid() {
        let id = RecordId::from_raw(7);
        assert!(id.is_valid());
        assert_eq!(id.as_raw(), 7);
    }

    #[test]
    fn debug_marks_sentinel() {
        assert_eq!(format!("{:?}", RecordId::INVALID), "RecordId(INVALID)");
        assert_eq!(format!("{:?}", RecordId::from_raw(3)), "RecordId(3)");
    }

    #[test]
    fn root_node() {
        assert!(NodeId::ROOT.is_root());
        assert!(!NodeId::from_raw(4).is_root());
        assert_eq!(format!("{}", NodeId::from_raw(4)), "n4");
    }

    #[test]
    fn serde_roundtrip() {
        let id = NodeId::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let parsed: NodeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }
}

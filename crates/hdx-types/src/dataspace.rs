use serde::{Deserialize, Serialize};

/// Shape descriptor of a record's payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataspace {
    /// Exactly one element.
    Scalar,
    /// An n-dimensional array. `Simple(vec![0])` is the empty array.
    Simple(Vec<u64>),
}

impl Dataspace {
    /// A one-dimensional dataspace of `len` elements.
    pub fn vector(len: usize) -> Self {
        Self::Simple(vec![len as u64])
    }

    /// Number of elements described by this dataspace, or `None` if the
    /// product of the dimensions overflows `u64`.
    pub fn element_count(&self) -> Option<u64> {
        match self {
            Self::Scalar => Some(1),
            Self::Simple(dims) => checked_count(dims),
        }
    }

    /// Bytes needed for the elements at `element_size` bytes each, or `None`
    /// on overflow.
    pub fn byte_len(&self, element_size: usize) -> Option<u64> {
        self.element_count()?.checked_mul(element_size as u64)
    }

    /// Returns `true` if the dataspace holds no elements.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar => false,
            Self::Simple(dims) => dims.contains(&0),
        }
    }

    /// Dimensions; the scalar dataspace has none.
    pub fn dims(&self) -> &[u64] {
        match self {
            Self::Scalar => &[],
            Self::Simple(dims) => dims,
        }
    }
}

/// Product of `dims`, or `None` on overflow. Any zero dimension gives zero.
pub(crate) fn checked_count(dims: &[u64]) -> Option<u64> {
    if dims.contains(&0) {
        return Some(0);
    }
    dims.iter().try_fold(1u64, |acc, d| acc.checked_mul(*d))
}

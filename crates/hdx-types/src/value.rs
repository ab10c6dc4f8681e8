//! Attribute payloads.
//!
//! [`Value`] is the tagged variant handed to the write path and returned by
//! the read path. Every value can infer its own [`Datatype`] and
//! [`Dataspace`], and [`Value::decode`] rebuilds a value from a stored record.
//!
//! Numeric payloads are little-endian. Text elements are UTF-8 followed by a
//! single NUL byte; a text array is the concatenation of its elements.

use serde::{Deserialize, Serialize};

use crate::dataspace::{checked_count, Dataspace};
use crate::datatype::{Datatype, ScalarKind};
use crate::error::TypeError;

/// A single numeric, boolean or complex element.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// `(re, im)`
    C32(f32, f32),
    /// `(re, im)`
    C64(f64, f64),
}

impl Scalar {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::C32(..) => ScalarKind::C32,
            Self::C64(..) => ScalarKind::C64,
        }
    }

    /// Append the little-endian encoding of this element to `out`.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        match *self {
            Self::Bool(v) => out.push(v as u8),
            Self::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U8(v) => out.push(v),
            Self::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::C32(re, im) => {
                out.extend_from_slice(&re.to_le_bytes());
                out.extend_from_slice(&im.to_le_bytes());
            }
            Self::C64(re, im) => {
                out.extend_from_slice(&re.to_le_bytes());
                out.extend_from_slice(&im.to_le_bytes());
            }
        }
    }

    /// Single-element buffer holding this scalar.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.kind().size());
        self.write_le(&mut out);
        out
    }

    /// Decode one element of `kind` from exactly `kind.size()` bytes.
    pub fn from_le_bytes(kind: ScalarKind, bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != kind.size() {
            return Err(TypeError::SizeMismatch {
                expected: kind.size(),
                actual: bytes.len(),
            });
        }
        let scalar = match kind {
            ScalarKind::Bool => Self::Bool(bytes[0] != 0),
            ScalarKind::I8 => Self::I8(i8::from_le_bytes(le(bytes))),
            ScalarKind::I16 => Self::I16(i16::from_le_bytes(le(bytes))),
            ScalarKind::I32 => Self::I32(i32::from_le_bytes(le(bytes))),
            ScalarKind::I64 => Self::I64(i64::from_le_bytes(le(bytes))),
            ScalarKind::U8 => Self::U8(bytes[0]),
            ScalarKind::U16 => Self::U16(u16::from_le_bytes(le(bytes))),
            ScalarKind::U32 => Self::U32(u32::from_le_bytes(le(bytes))),
            ScalarKind::U64 => Self::U64(u64::from_le_bytes(le(bytes))),
            ScalarKind::F32 => Self::F32(f32::from_le_bytes(le(bytes))),
            ScalarKind::F64 => Self::F64(f64::from_le_bytes(le(bytes))),
            ScalarKind::C32 => Self::C32(
                f32::from_le_bytes(le(&bytes[..4])),
                f32::from_le_bytes(le(&bytes[4..])),
            ),
            ScalarKind::C64 => Self::C64(
                f64::from_le_bytes(le(&bytes[..8])),
                f64::from_le_bytes(le(&bytes[8..])),
            ),
        };
        Ok(scalar)
    }

    /// Integer value, if this is an integer that fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v),
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Real value of any non-complex numeric scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::F32(v) => Some(v.into()),
            Self::F64(v) => Some(v),
            Self::Bool(_) | Self::C32(..) | Self::C64(..) => None,
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }
}

/// Copy a slice of known length into a fixed array.
fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut arr = [0u8; N];
    arr.copy_from_slice(bytes);
    arr
}

/// Fixed-size element types that can back an [`ArrayValue`].
pub trait Element: Copy {
    const KIND: ScalarKind;

    fn into_scalar(self) -> Scalar;

    fn from_scalar(scalar: Scalar) -> Option<Self>;
}

macro_rules! impl_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                const KIND: ScalarKind = ScalarKind::$variant;

                fn into_scalar(self) -> Scalar {
                    Scalar::$variant(self)
                }

                fn from_scalar(scalar: Scalar) -> Option<Self> {
                    match scalar {
                        Scalar::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Scalar(Scalar::$variant(v))
                }
            }

            impl From<Vec<$ty>> for Value {
                fn from(v: Vec<$ty>) -> Self {
                    Value::from_elements(&v)
                }
            }

            impl From<&[$ty]> for Value {
                fn from(v: &[$ty]) -> Self {
                    Value::from_elements(v)
                }
            }
        )*
    };
}

impl_element! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

/// A non-text array: element kind, shape and the raw element buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    kind: ScalarKind,
    shape: Vec<u64>,
    data: Vec<u8>,
}

impl ArrayValue {
    /// Build an array from a raw little-endian buffer.
    ///
    /// The buffer length must equal `product(shape) * kind.size()`.
    pub fn new(kind: ScalarKind, shape: Vec<u64>, data: Vec<u8>) -> Result<Self, TypeError> {
        if shape.is_empty() {
            return Err(TypeError::InvalidShape {
                shape,
                reason: "array shape needs at least one dimension".into(),
            });
        }
        let expected = checked_count(&shape)
            .and_then(|count| count.checked_mul(kind.size() as u64))
            .and_then(|len| usize::try_from(len).ok());
        let Some(expected) = expected else {
            return Err(TypeError::InvalidShape {
                shape,
                reason: "element count overflows".into(),
            });
        };
        if data.len() != expected {
            return Err(TypeError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { kind, shape, data })
    }

    /// One-dimensional array from a slice of elements.
    pub fn from_slice<T: Element>(elements: &[T]) -> Self {
        let mut data = Vec::with_capacity(elements.len() * T::KIND.size());
        for element in elements {
            element.into_scalar().write_le(&mut data);
        }
        Self {
            kind: T::KIND,
            shape: vec![elements.len() as u64],
            data,
        }
    }

    /// Reinterpret the array with a different shape of the same element count.
    pub fn reshape(self, shape: Vec<u64>) -> Result<Self, TypeError> {
        let count = checked_count(&shape);
        if shape.is_empty() || count != Some(self.len() as u64) {
            return Err(TypeError::InvalidShape {
                shape,
                reason: format!("cannot hold {} elements", self.len()),
            });
        }
        Ok(Self { shape, ..self })
    }

    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Raw little-endian element buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.kind.size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at flat index `index`.
    pub fn get(&self, index: usize) -> Option<Scalar> {
        let size = self.kind.size();
        let start = index.checked_mul(size)?;
        let bytes = self.data.get(start..start + size)?;
        Scalar::from_le_bytes(self.kind, bytes).ok()
    }

    /// Copy the elements out as `T`, which must match the element kind.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TypeError> {
        if T::KIND != self.kind {
            return Err(TypeError::TypeMismatch {
                expected: T::KIND.to_string(),
                found: self.kind.to_string(),
            });
        }
        self.data
            .chunks_exact(self.kind.size())
            .map(|chunk| {
                let scalar = Scalar::from_le_bytes(self.kind, chunk)?;
                T::from_scalar(scalar).ok_or_else(|| TypeError::TypeMismatch {
                    expected: T::KIND.to_string(),
                    found: scalar.kind().to_string(),
                })
            })
            .collect()
    }
}

/// An attribute payload.
///
/// A zero-element payload has several spellings: `Empty(dt)`, an empty
/// `TextArray` and an `Array` of shape `[0]`. They store identically, read
/// back as `Empty` and compare equal. A numeric `Array` whose shape has a
/// zero dimension elsewhere (e.g. `[2, 0]`) keeps its shape.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    /// Numeric, boolean or complex scalar.
    Scalar(Scalar),
    /// Scalar string.
    Text(String),
    /// One-dimensional array of strings.
    TextArray(Vec<String>),
    /// Zero-element array of the given element type.
    Empty(Datatype),
    /// Numeric array.
    Array(ArrayValue),
}

impl Value {
    fn from_elements<T: Element>(elements: &[T]) -> Self {
        if elements.is_empty() {
            Value::Empty(Datatype::Scalar(T::KIND))
        } else {
            Value::Array(ArrayValue::from_slice(elements))
        }
    }

    /// Text array value; an empty input yields `Empty(Text)`.
    pub fn text_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            Value::Empty(Datatype::Text)
        } else {
            Value::TextArray(items)
        }
    }

    /// Inferred datatype descriptor.
    pub fn datatype(&self) -> Datatype {
        match self {
            Self::Scalar(s) => Datatype::Scalar(s.kind()),
            Self::Text(_) | Self::TextArray(_) => Datatype::Text,
            Self::Empty(dt) => *dt,
            Self::Array(a) => Datatype::Scalar(a.kind()),
        }
    }

    /// Inferred dataspace descriptor.
    pub fn dataspace(&self) -> Dataspace {
        match self {
            Self::Scalar(_) | Self::Text(_) => Dataspace::Scalar,
            Self::TextArray(items) => Dataspace::vector(items.len()),
            Self::Empty(_) => Dataspace::vector(0),
            Self::Array(a) => Dataspace::Simple(a.shape().to_vec()),
        }
    }

    /// Number of elements in the payload.
    pub fn element_count(&self) -> u64 {
        match self {
            Self::Scalar(_) | Self::Text(_) => 1,
            Self::TextArray(items) => items.len() as u64,
            Self::Empty(_) => 0,
            Self::Array(a) => a.len() as u64,
        }
    }

    /// Element type if this is a zero-element payload spelled as `Empty`.
    fn empty_datatype(&self) -> Option<Datatype> {
        match self {
            Self::Empty(dt) => Some(*dt),
            Self::TextArray(items) if items.is_empty() => Some(Datatype::Text),
            Self::Array(a) if a.shape() == [0] => Some(Datatype::Scalar(a.kind())),
            _ => None,
        }
    }

    /// The canonical spelling of this value.
    pub fn normalize(self) -> Self {
        match self.empty_datatype() {
            Some(dt) => Self::Empty(dt),
            None => self,
        }
    }

    /// Rebuild a value from a stored record.
    ///
    /// Zero-element records decode to `Empty`, except numeric arrays whose
    /// shape is not `[0]`, which decode to an empty `Array` of that shape.
    pub fn decode(datatype: Datatype, dataspace: &Dataspace, bytes: &[u8]) -> Result<Self, TypeError> {
        let count = dataspace
            .element_count()
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| TypeError::InvalidShape {
                shape: dataspace.dims().to_vec(),
                reason: "element count overflows".into(),
            })?;
        if count == 0 {
            return Ok(match (datatype, dataspace) {
                (Datatype::Scalar(kind), Dataspace::Simple(dims)) if dims[..] != [0] => {
                    Value::Array(ArrayValue::new(kind, dims.clone(), Vec::new())?)
                }
                _ => Value::Empty(datatype),
            });
        }
        match (datatype, dataspace) {
            (Datatype::Text, Dataspace::Scalar) => {
                let mut items = decode_text(bytes, 1)?;
                Ok(Value::Text(items.remove(0)))
            }
            (Datatype::Text, Dataspace::Simple(_)) => Ok(Value::TextArray(decode_text(bytes, count)?)),
            (Datatype::Scalar(kind), Dataspace::Scalar) => {
                Ok(Value::Scalar(Scalar::from_le_bytes(kind, bytes)?))
            }
            (Datatype::Scalar(kind), Dataspace::Simple(dims)) => {
                Ok(Value::Array(ArrayValue::new(kind, dims.clone(), bytes.to_vec())?))
            }
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_scalar().and_then(Scalar::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// String elements; `Empty(Text)` yields an empty slice.
    pub fn as_text_array(&self) -> Option<&[String]> {
        match self {
            Self::TextArray(items) => Some(items),
            Self::Empty(Datatype::Text) => Some(&[]),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Copy numeric array elements out as `T`; `Empty` of the same kind
    /// yields an empty vector.
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>, TypeError> {
        match self {
            Self::Array(a) => a.to_vec(),
            Self::Empty(Datatype::Scalar(kind)) if *kind == T::KIND => Ok(Vec::new()),
            other => Err(TypeError::TypeMismatch {
                expected: format!("{} array", T::KIND),
                found: other.datatype().to_string(),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self.empty_datatype(), other.empty_datatype()) {
            (Some(a), Some(b)) => return a == b,
            (None, None) => {}
            _ => return false,
        }
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::TextArray(a), Self::TextArray(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a).normalize()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::text_array(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::text_array(items)
    }
}

/// Encode one string as UTF-8 followed by a NUL terminator.
pub fn encode_text(s: &str, out: &mut Vec<u8>) -> Result<(), TypeError> {
    if s.as_bytes().contains(&0) {
        return Err(TypeError::MalformedText(format!(
            "string contains an interior NUL: {s:?}"
        )));
    }
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(())
}

/// Split a buffer of `count` NUL-terminated strings.
pub fn decode_text(bytes: &[u8], count: usize) -> Result<Vec<String>, TypeError> {
    let mut items = Vec::with_capacity(count);
    let mut rest = bytes;
    while items.len() < count {
        let end = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| TypeError::MalformedText("missing NUL terminator".into()))?;
        let item = std::str::from_utf8(&rest[..end])
            .map_err(|e| TypeError::MalformedText(e.to_string()))?;
        items.push(item.to_owned());
        rest = &rest[end + 1..];
    }
    if !rest.is_empty() {
        return Err(TypeError::MalformedText(format!(
            "{} trailing bytes after {count} strings",
            rest.len()
        )));
    }
    Ok(items)
}

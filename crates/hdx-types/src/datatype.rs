use serde::{Deserialize, Serialize};

/// Element kind of a fixed-size numeric record.
///
/// All kinds are stored little-endian. Complex kinds are a `(re, im)` pair of
/// the matching float width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    C32,
    C64,
}

impl ScalarKind {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 | Self::C32 => 8,
            Self::C64 => 16,
        }
    }

    /// Returns `true` for the complex kinds.
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::C32 | Self::C64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::U8 | Self::U16 | Self::U32 | Self::U64
        )
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::C32 => "c32",
            Self::C64 => "c64",
        };
        f.write_str(name)
    }
}

/// Type descriptor governing how a record's bytes are interpreted.
///
/// Fixed at record creation. `Text` is a variable-length UTF-8 string; each
/// element is stored NUL-terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datatype {
    Scalar(ScalarKind),
    Text,
}

impl Datatype {
    /// Fixed element size, or `None` for variable-length text.
    pub fn element_size(&self) -> Option<usize> {
        match self {
            Self::Scalar(kind) => Some(kind.size()),
            Self::Text => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(kind) => write!(f, "{kind}"),
            Self::Text => f.write_str("text"),
        }
    }
}

impl From<ScalarKind> for Datatype {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

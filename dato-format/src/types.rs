//! Type tag and vector subtype enumerations

use crate::constants::*;
use crate::error::DatoError;

/// Value type tags stored in container entries and the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    /// Null value
    Null = TAG_NULL,
    /// Embedded boolean
    Bool = TAG_BOOL,
    /// Embedded `i32`
    Int32 = TAG_INT32,
    /// Embedded `u32`
    UInt32 = TAG_UINT32,
    /// Embedded `f32`
    Float32 = TAG_FLOAT32,
    /// Referenced `i64`
    Int64 = TAG_INT64,
    /// Referenced `u64`
    UInt64 = TAG_UINT64,
    /// Referenced `f64`
    Float64 = TAG_FLOAT64,
    /// Array of values
    Array = TAG_ARRAY,
    /// Map keyed by byte strings
    StringMap = TAG_STRING_MAP,
    /// Map keyed by `u32`
    IntMap = TAG_INT_MAP,
    /// UTF-8 string
    String8 = TAG_STRING8,
    /// UTF-16 string
    String16 = TAG_STRING16,
    /// UTF-32 string
    String32 = TAG_STRING32,
    /// Raw bytes
    ByteArray = TAG_BYTE_ARRAY,
    /// One numeric vector
    Vector = TAG_VECTOR,
    /// Array of numeric vectors
    VectorArray = TAG_VECTOR_ARRAY,
}

impl TypeTag {
    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self, DatoError> {
        Ok(match val {
            TAG_NULL => TypeTag::Null,
            TAG_BOOL => TypeTag::Bool,
            TAG_INT32 => TypeTag::Int32,
            TAG_UINT32 => TypeTag::UInt32,
            TAG_FLOAT32 => TypeTag::Float32,
            TAG_INT64 => TypeTag::Int64,
            TAG_UINT64 => TypeTag::UInt64,
            TAG_FLOAT64 => TypeTag::Float64,
            TAG_ARRAY => TypeTag::Array,
            TAG_STRING_MAP => TypeTag::StringMap,
            TAG_INT_MAP => TypeTag::IntMap,
            TAG_STRING8 => TypeTag::String8,
            TAG_STRING16 => TypeTag::String16,
            TAG_STRING32 => TypeTag::String32,
            TAG_BYTE_ARRAY => TypeTag::ByteArray,
            TAG_VECTOR => TypeTag::Vector,
            TAG_VECTOR_ARRAY => TypeTag::VectorArray,
            other => return Err(DatoError::UnknownType(other)),
        })
    }

    /// Whether values of this type store an offset rather than the value.
    pub fn is_reference(self) -> bool {
        is_reference_type(self as u8)
    }
}

/// Reference-ness is decided by the raw tag alone, so unknown future tags
/// are treated as references.
#[inline]
pub fn is_reference_type(tag: u8) -> bool {
    tag >= FIRST_REFERENCE_TAG
}

/// Element type of a vector or vector array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subtype {
    /// `i8`
    I8 = 0,
    /// `u8`
    U8 = 1,
    /// `i16`
    I16 = 2,
    /// `u16`
    U16 = 3,
    /// `i32`
    I32 = 4,
    /// `u32`
    U32 = 5,
    /// `i64`
    I64 = 6,
    /// `u64`
    U64 = 7,
    /// `f32`
    F32 = 8,
    /// `f64`
    F64 = 9,
}

impl Subtype {
    /// Convert from u8
    pub fn from_u8(val: u8) -> Result<Self, DatoError> {
        Ok(match val {
            0 => Subtype::I8,
            1 => Subtype::U8,
            2 => Subtype::I16,
            3 => Subtype::U16,
            4 => Subtype::I32,
            5 => Subtype::U32,
            6 => Subtype::I64,
            7 => Subtype::U64,
            8 => Subtype::F32,
            9 => Subtype::F64,
            other => return Err(DatoError::UnknownSubtype(other)),
        })
    }

    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            Subtype::I8 | Subtype::U8 => 1,
            Subtype::I16 | Subtype::U16 => 2,
            Subtype::I32 | Subtype::U32 | Subtype::F32 => 4,
            Subtype::I64 | Subtype::U64 | Subtype::F64 => 8,
        }
    }
}

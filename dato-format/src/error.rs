//! Error types for DATO format

use crate::types::{Subtype, TypeTag};
use thiserror::Error;

/// DATO error types
#[derive(Debug, Error)]
pub enum DatoError {
    /// Input ended before the fixed header fields.
    #[error("Unexpected end of buffer")]
    UnexpectedEof,
    /// Input does not start with the expected prefix bytes.
    #[error("Invalid magic prefix")]
    InvalidMagic,
    /// Size strategy identifier is unknown or does not match the decoder.
    #[error("Unsupported config id: {0}")]
    UnsupportedConfig(u8),
    /// A known type tag was required but the byte is not one.
    #[error("Unknown type tag: {0}")]
    UnknownType(u8),
    /// A known vector subtype was required but the byte is not one.
    #[error("Unknown vector subtype: {0}")]
    UnknownSubtype(u8),
    /// A read would go past the end of the buffer.
    #[error("Read of {size} bytes at offset {offset} exceeds buffer length {len}")]
    OutOfBounds {
        /// First byte of the attempted read.
        offset: usize,
        /// Number of bytes requested.
        size: usize,
        /// Length of the buffer.
        len: usize,
    },
    /// A strict accessor was used on a value of another type.
    #[error("Type mismatch: expected {expected:?}, found type tag {found}")]
    TypeMismatch {
        /// Type the accessor requires.
        expected: TypeTag,
        /// Raw type tag of the value.
        found: u8,
    },
    /// A typed vector accessor was requested for another element type.
    #[error("Subtype mismatch: expected {expected:?}, found subtype {found}")]
    SubtypeMismatch {
        /// Element type the accessor requires.
        expected: Subtype,
        /// Raw subtype byte of the value.
        found: u8,
    },
    /// An element or entry index is past the end of its container.
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of elements available.
        len: usize,
    },
    /// A size does not fit the field chosen by the size strategy.
    #[error("Size {value} exceeds field capacity {max}")]
    SizeOverflow {
        /// Size that was written.
        value: u64,
        /// Largest value the field can hold.
        max: u64,
    },
    /// Vector element count is outside `1..=255` or does not divide the data.
    #[error("Invalid vector element count: {0}")]
    InvalidElementCount(usize),
    /// A reference does not point before the container holding it, either
    /// while encoding or in a malformed buffer.
    #[error("Value at {position} is not before container at {base}")]
    ForwardReference {
        /// Absolute position of the referenced value.
        position: u32,
        /// Position of the container.
        base: u32,
    },
    /// Buffer grew past what 32-bit offsets can address.
    #[error("Buffer of {0} bytes exceeds 32-bit addressing")]
    BufferTooLarge(usize),
    /// String8 payload is not valid UTF-8.
    #[error("Invalid UTF-8 in string value")]
    InvalidUtf8,
    /// I/O operation failed while reading or writing data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DatoError {
    /// Shorthand for a bounds violation.
    pub fn out_of_bounds(offset: usize, size: usize, len: usize) -> Self {
        DatoError::OutOfBounds { offset, size, len }
    }

    /// True for errors caused by reading outside the buffer.
    pub fn is_bounds_violation(&self) -> bool {
        matches!(self, DatoError::OutOfBounds { .. })
    }

    /// True for errors caused by asking for the wrong type.
    pub fn is_type_violation(&self) -> bool {
        matches!(
            self,
            DatoError::TypeMismatch { .. } | DatoError::SubtypeMismatch { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DatoError>;

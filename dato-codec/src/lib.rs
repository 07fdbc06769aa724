//! DATO Codec - Encoder/decoder engines
//!
//! This crate builds and reads DATO buffers:
//!
//! - Append-only encoder with key deduplication and sorted containers
//! - Zero-copy decoder with typed and dynamic accessors
//! - Depth-first visitor over any value
//! - JSON conversion in both directions

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod container;
pub mod decoder;
pub mod dynamic;
pub mod encoder;
pub mod handle;
pub mod json;
pub mod key_table;
pub mod sort;
pub mod typed;
pub mod visitor;

// Re-export commonly used types
pub use dato_format::{
    AdaptiveConfig, Compact, CompactValues, DatoError, FixedSizes, Header, Primitive, Result,
    SizeCategory, SizeEncoding, SizeStrategy, Subtype, TypeTag, Validation,
};

// Re-export our own types
pub use container::{ArrayAccessor, IntMapAccessor, StringMapAccessor};
pub use decoder::Decoder;
pub use dynamic::{CastNumber, DynamicAccessor};
pub use encoder::Encoder;
pub use handle::{IntMapEntry, KeyRef, StringMapEntry, ValueRef};
pub use json::{encode_json, to_json, JsonBuilder};
pub use typed::{
    ByteArrayAccessor, RawVector, String16Accessor, String32Accessor, String8Accessor,
    TypedArrayAccessor, VectorAccessor, VectorArrayAccessor,
};
pub use visitor::Visitor;

use dato_format::constants::{FLAG_ALIGNED, FLAG_SORTED_KEYS};
use serde::Deserialize;

// Encoding options

/// Encoder options
///
/// Deserializable so a TOML or JSON file may set any subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// Header prefix; decoders must be opened with the same bytes
    pub prefix: String,
    /// Pad values to their natural alignment
    pub aligned: bool,
    /// Store map entries in ascending key order so lookups can bisect
    pub sorted_keys: bool,
    /// Write each distinct string key once and share it
    pub skip_duplicate_keys: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            prefix: "DATO".to_string(),
            aligned: true,
            sorted_keys: true,
            skip_duplicate_keys: true,
        }
    }
}

impl EncoderOptions {
    /// Header flag byte for these options
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.aligned {
            flags |= FLAG_ALIGNED;
        }
        if self.sorted_keys {
            flags |= FLAG_SORTED_KEYS;
        }
        flags
    }
}

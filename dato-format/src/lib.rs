//! DATO Format - Core primitives for the DATO binary data format
//!
//! This crate provides the building blocks shared by the encoder and decoder,
//! with no I/O dependencies. It includes:
//!
//! - Header prefix, flags and type tag constants
//! - Fixed-width little-endian scalar reads
//! - Short-or-4-byte size encoding
//! - Size strategies (static and run-time resolved)
//! - The append-only byte buffer
//! - Header layout
//! - Error types
//! - Decoder validation toggles

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod primitive;
pub mod types;
pub mod validation;
pub mod varint;

// Re-export commonly used types
pub use buffer::AppendBuffer;
pub use config::{
    AdaptiveConfig, Compact, CompactValues, FixedSizes, SizeCategory, SizeEncoding, SizeStrategy,
};
pub use error::{DatoError, Result};
pub use header::{Header, HeaderSlots};
pub use primitive::Primitive;
pub use types::{is_reference_type, Subtype, TypeTag};
pub use validation::Validation;

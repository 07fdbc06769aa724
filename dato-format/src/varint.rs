//! Short-or-4-byte ("short32") size encoding
//!
//! Values below 255 take one byte. Anything else is the marker byte `0xFF`
//! followed by the value as a little-endian `u32`.

use crate::constants::SHORT32_MARKER;
use crate::error::{DatoError, Result};
use smallvec::SmallVec;

/// Encoded length of `val` in bytes (1 or 5)
#[inline]
pub fn short32_len(val: u32) -> usize {
    if val < SHORT32_MARKER as u32 {
        1
    } else {
        5
    }
}

/// Encode a u32 as short32
pub fn encode_short32(val: u32) -> SmallVec<[u8; 5]> {
    let mut result = SmallVec::new();
    if val < SHORT32_MARKER as u32 {
        result.push(val as u8);
    } else {
        result.push(SHORT32_MARKER);
        result.extend_from_slice(&val.to_le_bytes());
    }
    result
}

/// Decode short32 from the start of `bytes`, returning the value and the
/// number of bytes consumed.
pub fn decode_short32(bytes: &[u8]) -> Result<(u32, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| DatoError::out_of_bounds(0, 1, bytes.len()))?;
    if first != SHORT32_MARKER {
        return Ok((first as u32, 1));
    }
    let raw = bytes
        .get(1..5)
        .ok_or_else(|| DatoError::out_of_bounds(1, 4, bytes.len()))?;
    Ok((u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]), 5))
}

//! Growable, append-only byte buffer used by the encoder

use crate::error::{DatoError, Result};
use crate::primitive::Primitive;

/// Round `x` up to the next multiple of `n` (`n` must be non-zero).
#[inline]
pub fn round_up(x: usize, n: usize) -> usize {
    x.div_ceil(n) * n
}

/// Append-only byte sequence
///
/// Positions returned by the encoder are offsets into this buffer and stay
/// valid across growth. Slices obtained from [`AppendBuffer::as_slice`]
/// borrow the buffer and so cannot be held across the next append.
#[derive(Debug, Clone, Default)]
pub struct AppendBuffer {
    data: Vec<u8>,
}

impl AppendBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Current length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current length as a 32-bit buffer offset
    #[inline]
    pub fn position(&self) -> Result<u32> {
        u32::try_from(self.data.len()).map_err(|_| DatoError::BufferTooLarge(self.data.len()))
    }

    /// Written bytes
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Give up the buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Append raw bytes
    #[inline]
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append one byte
    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    /// Append a little-endian `u32`
    #[inline]
    pub fn push_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a little-endian scalar
    #[inline]
    pub fn push_le<T: Primitive>(&mut self, value: T) {
        value.extend_le(&mut self.data);
    }

    /// Append a run of little-endian scalars
    pub fn push_le_slice<T: Primitive>(&mut self, values: &[T]) {
        self.data.reserve(values.len() * T::SIZE);
        for value in values {
            value.extend_le(&mut self.data);
        }
    }

    /// Append `count` zero bytes
    pub fn zero_fill(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Append zero bytes until the length reaches `target`; no-op if already there.
    pub fn zero_fill_to(&mut self, target: usize) {
        if target > self.data.len() {
            self.data.resize(target, 0);
        }
    }

    /// Pad with zeros to a multiple of `align` (0 or 1 means none), then
    /// append `bytes`. Returns the position of the first appended byte.
    pub fn push_aligned(&mut self, bytes: &[u8], align: usize) -> usize {
        if align > 1 {
            self.zero_fill_to(round_up(self.data.len(), align));
        }
        let pos = self.data.len();
        self.data.extend_from_slice(bytes);
        pos
    }

    /// Overwrite already-written bytes at `pos`.
    pub fn patch(&mut self, pos: usize, bytes: &[u8]) -> Result<()> {
        let len = self.data.len();
        let end = pos
            .checked_add(bytes.len())
            .filter(|end| *end <= len)
            .ok_or_else(|| DatoError::out_of_bounds(pos, bytes.len(), len))?;
        self.data[pos..end].copy_from_slice(bytes);
        Ok(())
    }
}

//! Fixed-width little-endian scalars
//!
//! Reads never assume alignment: values are copied out of the byte slice.
//! The `unchecked` feature adds a raw read that also skips the bounds check.

use crate::error::{DatoError, Result};
use crate::types::Subtype;
use std::fmt::Debug;

/// Numeric types that can be stored as vector elements or raw scalars.
pub trait Primitive: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Encoded size in bytes
    const SIZE: usize;
    /// Vector subtype for this element type
    const SUBTYPE: Subtype;

    /// Decode from exactly `SIZE` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding to `out`.
    fn extend_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_primitive {
    ($($ty:ty => $subtype:ident),* $(,)?) => {
        $(
            impl Primitive for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();
                const SUBTYPE: Subtype = Subtype::$subtype;

                #[inline]
                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(raw)
                }

                #[inline]
                fn extend_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_primitive! {
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}

/// Read a `T` at `pos`, failing with `OutOfBounds` past the end of `data`.
#[inline]
pub fn read_at<T: Primitive>(data: &[u8], pos: usize) -> Result<T> {
    let end = pos
        .checked_add(T::SIZE)
        .ok_or_else(|| DatoError::out_of_bounds(pos, T::SIZE, data.len()))?;
    data.get(pos..end)
        .map(T::from_le_slice)
        .ok_or_else(|| DatoError::out_of_bounds(pos, T::SIZE, data.len()))
}

/// Check that `size` bytes starting at `pos` lie inside a buffer of `len` bytes.
#[inline]
pub fn check_extent(pos: usize, size: usize, len: usize) -> Result<()> {
    match pos.checked_add(size) {
        Some(end) if end <= len => Ok(()),
        _ => Err(DatoError::out_of_bounds(pos, size, len)),
    }
}

/// Read a `T` at `pos` without a bounds check.
///
/// # Safety
///
/// `pos + T::SIZE` must not exceed `data.len()`.
#[cfg(feature = "unchecked")]
#[allow(unsafe_code)]
#[inline]
pub unsafe fn read_at_unchecked<T: Primitive>(data: &[u8], pos: usize) -> T {
    let bytes = std::slice::from_raw_parts(data.as_ptr().add(pos), T::SIZE);
    T::from_le_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_unaligned_scalars() {
        let mut data = vec![0xAA];
        0x1122_3344u32.extend_le(&mut data);
        (-2i64).extend_le(&mut data);
        2.5f64.extend_le(&mut data);

        assert_eq!(read_at::<u32>(&data, 1).unwrap(), 0x1122_3344);
        assert_eq!(read_at::<i64>(&data, 5).unwrap(), -2);
        assert_eq!(read_at::<f64>(&data, 13).unwrap(), 2.5);
        assert_eq!(read_at::<u8>(&data, 0).unwrap(), 0xAA);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut data = Vec::new();
        0x0102u16.extend_le(&mut data);
        assert_eq!(data, vec![0x02, 0x01]);
    }

    #[test]
    fn test_read_past_end() {
        let data = [1u8, 2, 3];
        match read_at::<u32>(&data, 0) {
            Err(DatoError::OutOfBounds { offset, size, len }) => {
                assert_eq!((offset, size, len), (0, 4, 3));
            }
            other => panic!("expected OutOfBounds, got {other:?}"),
        }
        assert!(read_at::<u8>(&data, 3).is_err());
        assert!(read_at::<u8>(&data, usize::MAX).is_err());
    }

    #[test]
    fn test_check_extent() {
        assert!(check_extent(0, 4, 4).is_ok());
        assert!(check_extent(1, 4, 4).is_err());
        assert!(check_extent(usize::MAX, 2, 4).is_err());
    }

    #[test]
    fn test_subtype_constants() {
        assert_eq!(<f32 as Primitive>::SUBTYPE, Subtype::F32);
        assert_eq!(<f32 as Primitive>::SIZE, 4);
        assert_eq!(<i8 as Primitive>::SUBTYPE, Subtype::I8);
        assert_eq!(<u64 as Primitive>::SIZE, 8);
    }

    #[cfg(feature = "unchecked")]
    #[test]
    fn test_unchecked_matches_checked() {
        let mut data = vec![0u8; 3];
        0xDEAD_BEEFu32.extend_le(&mut data);
        #[allow(unsafe_code)]
        let fast = unsafe { read_at_unchecked::<u32>(&data, 3) };
        assert_eq!(fast, read_at::<u32>(&data, 3).unwrap());
    }
}

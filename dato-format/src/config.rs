//! Size strategies
//!
//! A strategy decides, for each of four size categories, which
//! [`SizeEncoding`] is used. The strategy id is stored in the buffer header.
//! [`FixedSizes`], [`CompactValues`] and [`Compact`] are resolved at compile
//! time; [`AdaptiveConfig`] is resolved from the header byte at run time.

use crate::buffer::{round_up, AppendBuffer};
use crate::constants::{CONFIG_COMPACT, CONFIG_COMPACT_VALUES, CONFIG_FIXED_SIZES, SHORT32_MARKER};
use crate::error::{DatoError, Result};
use crate::primitive::read_at;
use crate::varint::{decode_short32, encode_short32};
use std::fmt::Debug;

/// How one size field is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeEncoding {
    /// Always one byte
    Fixed8,
    /// Always two bytes
    Fixed16,
    /// Always four bytes
    Fixed32,
    /// One byte below 255, otherwise marker plus four bytes
    Short32,
}

impl SizeEncoding {
    /// Largest value the field can hold
    pub fn max_value(self) -> u32 {
        match self {
            SizeEncoding::Fixed8 => u8::MAX as u32,
            SizeEncoding::Fixed16 => u16::MAX as u32,
            SizeEncoding::Fixed32 | SizeEncoding::Short32 => u32::MAX,
        }
    }

    /// Read a size at `*pos`, advancing `pos` past it.
    pub fn read(self, data: &[u8], pos: &mut usize) -> Result<u32> {
        let (value, consumed) = match self {
            SizeEncoding::Fixed8 => (read_at::<u8>(data, *pos)? as u32, 1),
            SizeEncoding::Fixed16 => (read_at::<u16>(data, *pos)? as u32, 2),
            SizeEncoding::Fixed32 => (read_at::<u32>(data, *pos)?, 4),
            SizeEncoding::Short32 => {
                let tail = data
                    .get(*pos..)
                    .ok_or_else(|| DatoError::out_of_bounds(*pos, 1, data.len()))?;
                decode_short32(tail).map_err(|_| {
                    let size = if tail.first() == Some(&SHORT32_MARKER) { 5 } else { 1 };
                    DatoError::out_of_bounds(*pos, size, data.len())
                })?
            }
        };
        *pos += consumed;
        Ok(value)
    }

    /// Write `value`, optionally preceded by `prefix`, and return the
    /// position where the prefix (or the size field) starts.
    ///
    /// With a non-zero `align`, zero padding is inserted first so that the
    /// byte following the size field lands on a multiple of the alignment,
    /// raised to the field's own width for multi-byte fields.
    pub fn write(
        self,
        buf: &mut AppendBuffer,
        value: usize,
        align: usize,
        prefix: &[u8],
    ) -> Result<u32> {
        let max = self.max_value();
        let value = u32::try_from(value)
            .ok()
            .filter(|v| *v <= max)
            .ok_or(DatoError::SizeOverflow {
                value: value as u64,
                max: max as u64,
            })?;

        let (width, min_align) = match self {
            SizeEncoding::Fixed8 => (1, 1),
            SizeEncoding::Fixed16 => (2, 2),
            SizeEncoding::Fixed32 => (4, 4),
            SizeEncoding::Short32 if value < SHORT32_MARKER as u32 => (1, 1),
            SizeEncoding::Short32 => (5, 4),
        };

        let mut pos = buf.len();
        if align != 0 {
            let align = align.max(min_align);
            let total = width + prefix.len();
            pos = round_up(pos + total, align) - total;
            buf.zero_fill_to(pos);
        }
        buf.push_bytes(prefix);
        match self {
            SizeEncoding::Fixed8 => buf.push_byte(value as u8),
            SizeEncoding::Fixed16 => buf.push_bytes(&(value as u16).to_le_bytes()),
            SizeEncoding::Fixed32 => buf.push_u32(value),
            SizeEncoding::Short32 => buf.push_bytes(&encode_short32(value)),
        }
        u32::try_from(pos).map_err(|_| DatoError::BufferTooLarge(pos))
    }
}

/// The four kinds of size fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCategory {
    /// Byte length of a string map key
    KeyLength = 0,
    /// Entry count of a string map or int map
    MapSize = 1,
    /// Entry count of an array
    ArrayLength = 2,
    /// Element count of strings, byte arrays and vector arrays
    ValueLength = 3,
}

/// Encodings per category, indexed by `SizeCategory as usize`
pub type SizeTable = [SizeEncoding; 4];

use SizeEncoding::{Fixed32, Short32};

const FIXED_SIZES_TABLE: SizeTable = [Fixed32, Fixed32, Fixed32, Fixed32];
const COMPACT_VALUES_TABLE: SizeTable = [Fixed32, Fixed32, Fixed32, Short32];
const COMPACT_TABLE: SizeTable = [Fixed32, Short32, Short32, Short32];

/// Encoding table for a known config id
pub fn size_table(id: u8) -> Option<SizeTable> {
    match id {
        CONFIG_FIXED_SIZES => Some(FIXED_SIZES_TABLE),
        CONFIG_COMPACT_VALUES => Some(COMPACT_VALUES_TABLE),
        CONFIG_COMPACT => Some(COMPACT_TABLE),
        _ => None,
    }
}

/// Per-buffer choice of size encodings
pub trait SizeStrategy: Copy + Debug + Send + Sync + 'static {
    /// Build the strategy for a header id, or `None` if this strategy
    /// cannot read buffers with that id.
    fn from_id(id: u8) -> Option<Self>;

    /// Id written to the header
    fn id(&self) -> u8;

    /// Encoding used for `category`
    fn encoding(&self, category: SizeCategory) -> SizeEncoding;

    /// Read a size of `category` at `*pos`, advancing `pos`.
    #[inline]
    fn read_size(&self, category: SizeCategory, data: &[u8], pos: &mut usize) -> Result<u32> {
        self.encoding(category).read(data, pos)
    }

    /// Write a size of `category`; see [`SizeEncoding::write`].
    #[inline]
    fn write_size(
        &self,
        category: SizeCategory,
        buf: &mut AppendBuffer,
        value: usize,
        align: usize,
        prefix: &[u8],
    ) -> Result<u32> {
        self.encoding(category).write(buf, value, align, prefix)
    }
}

macro_rules! static_strategy {
    ($(#[$meta:meta])* $name:ident, $id:expr, $table:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name;

        impl SizeStrategy for $name {
            #[inline]
            fn from_id(id: u8) -> Option<Self> {
                (id == $id).then_some($name)
            }

            #[inline]
            fn id(&self) -> u8 {
                $id
            }

            #[inline]
            fn encoding(&self, category: SizeCategory) -> SizeEncoding {
                $table[category as usize]
            }
        }
    };
}

static_strategy!(
    /// Every size is a 4-byte field (id 0)
    FixedSizes,
    CONFIG_FIXED_SIZES,
    FIXED_SIZES_TABLE
);
static_strategy!(
    /// Short32 value lengths, 4-byte everything else (id 1)
    CompactValues,
    CONFIG_COMPACT_VALUES,
    COMPACT_VALUES_TABLE
);
static_strategy!(
    /// Short32 map, array and value sizes, 4-byte key lengths (id 2)
    Compact,
    CONFIG_COMPACT,
    COMPACT_TABLE
);

/// Strategy resolved from a config id at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveConfig {
    id: u8,
    table: SizeTable,
}

impl AdaptiveConfig {
    /// Resolve a config id, rejecting unknown ids.
    pub fn resolve(id: u8) -> Result<Self> {
        Self::from_id(id).ok_or(DatoError::UnsupportedConfig(id))
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            id: CONFIG_FIXED_SIZES,
            table: FIXED_SIZES_TABLE,
        }
    }
}

impl SizeStrategy for AdaptiveConfig {
    fn from_id(id: u8) -> Option<Self> {
        size_table(id).map(|table| Self { id, table })
    }

    fn id(&self) -> u8 {
        self.id
    }

    fn encoding(&self, category: SizeCategory) -> SizeEncoding {
        self.table[category as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SizeCategory; 4] = [
        SizeCategory::KeyLength,
        SizeCategory::MapSize,
        SizeCategory::ArrayLength,
        SizeCategory::ValueLength,
    ];

    #[test]
    fn test_static_tables() {
        use SizeCategory::*;
        assert!(ALL.iter().all(|c| FixedSizes.encoding(*c) == Fixed32));

        assert_eq!(CompactValues.encoding(KeyLength), Fixed32);
        assert_eq!(CompactValues.encoding(MapSize), Fixed32);
        assert_eq!(CompactValues.encoding(ArrayLength), Fixed32);
        assert_eq!(CompactValues.encoding(ValueLength), Short32);

        assert_eq!(Compact.encoding(KeyLength), Fixed32);
        assert_eq!(Compact.encoding(MapSize), Short32);
        assert_eq!(Compact.encoding(ArrayLength), Short32);
        assert_eq!(Compact.encoding(ValueLength), Short32);
    }

    #[test]
    fn test_adaptive_matches_static() {
        for id in 0..3u8 {
            let adaptive = AdaptiveConfig::resolve(id).unwrap();
            assert_eq!(adaptive.id(), id);
            for category in ALL {
                let expected = match id {
                    0 => FixedSizes.encoding(category),
                    1 => CompactValues.encoding(category),
                    _ => Compact.encoding(category),
                };
                assert_eq!(adaptive.encoding(category), expected);
            }
        }
    }

    #[test]
    fn test_unknown_id_rejected() {
        match AdaptiveConfig::resolve(3) {
            Err(DatoError::UnsupportedConfig(3)) => {}
            other => panic!("expected UnsupportedConfig, got {other:?}"),
        }
        assert!(FixedSizes::from_id(1).is_none());
        assert!(Compact::from_id(2).is_some());
    }

    #[test]
    fn test_fixed32_write_aligned() {
        let mut buf = AppendBuffer::new();
        buf.push_byte(0xAA);
        let pos = Fixed32.write(&mut buf, 7, 4, &[]).unwrap();
        assert_eq!(pos, 4);
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf.as_slice()[4..], &7u32.to_le_bytes());
    }

    #[test]
    fn test_alignment_raised_to_field_width() {
        // Requested alignment 2 on a 4-byte field still lands on 4.
        let mut buf = AppendBuffer::new();
        buf.push_byte(0);
        let pos = Fixed32.write(&mut buf, 1, 2, &[]).unwrap();
        assert_eq!(pos, 4);
    }

    #[test]
    fn test_short32_write_aligns_following_payload() {
        let mut buf = AppendBuffer::new();
        buf.push_byte(0);
        // Short form: one byte, payload must start at a multiple of 8.
        let pos = Short32.write(&mut buf, 3, 8, &[]).unwrap();
        assert_eq!(pos, 7);
        assert_eq!(buf.len(), 8);

        // Long form: five bytes, payload aligned to 4 at least.
        let mut buf = AppendBuffer::new();
        let pos = Short32.write(&mut buf, 300, 2, &[]).unwrap();
        assert_eq!(pos, 3);
        assert_eq!(buf.len(), 8);
        assert_eq!(buf.as_slice()[3], SHORT32_MARKER);
    }

    #[test]
    fn test_write_with_prefix() {
        let mut buf = AppendBuffer::new();
        buf.push_byte(0);
        let pos = Short32.write(&mut buf, 2, 4, &[8, 3]).unwrap();
        // prefix (2) + size (1) ends on a 4-byte boundary
        assert_eq!(pos, 1);
        assert_eq!(&buf.as_slice()[1..], &[8, 3, 2]);
    }

    #[test]
    fn test_unaligned_write_has_no_padding() {
        let mut buf = AppendBuffer::new();
        buf.push_byte(0);
        let pos = Fixed32.write(&mut buf, 5, 0, &[]).unwrap();
        assert_eq!(pos, 1);
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut buf = AppendBuffer::new();
        match SizeEncoding::Fixed8.write(&mut buf, 256, 0, &[]) {
            Err(DatoError::SizeOverflow { value, max }) => {
                assert_eq!((value, max), (256, 255));
            }
            other => panic!("expected SizeOverflow, got {other:?}"),
        }
        assert!(buf.is_empty());
        assert!(SizeEncoding::Fixed16.write(&mut buf, 65_536, 0, &[]).is_err());
        assert!(SizeEncoding::Fixed16.write(&mut buf, 65_535, 0, &[]).is_ok());
    }

    #[test]
    fn test_read_roundtrip_all_encodings() {
        let encodings = [
            SizeEncoding::Fixed8,
            SizeEncoding::Fixed16,
            SizeEncoding::Fixed32,
            SizeEncoding::Short32,
        ];
        for encoding in encodings {
            for value in [0usize, 1, 200, 254, 255] {
                let mut buf = AppendBuffer::new();
                encoding.write(&mut buf, value, 0, &[]).unwrap();
                let mut pos = 0;
                let decoded = encoding.read(buf.as_slice(), &mut pos).unwrap();
                assert_eq!(decoded as usize, value);
                assert_eq!(pos, buf.len());
            }
        }
    }

    #[test]
    fn test_read_truncated() {
        let mut pos = 0;
        assert!(Fixed32.read(&[1, 2, 3], &mut pos).is_err());
        let mut pos = 0;
        let err = Short32.read(&[0xFF, 1], &mut pos).unwrap_err();
        assert!(err.is_bounds_violation());
        let mut pos = 5;
        assert!(Short32.read(&[0], &mut pos).is_err());
    }
}

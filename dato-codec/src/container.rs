//! Map and array accessors
//!
//! Container layout after the entry count (`base` is the position right
//! after it):
//!
//! - maps: `count` key words, `count` value slots, `count` type bytes
//! - arrays: `count` value slots, `count` type bytes
//!
//! Value slots hold embedded payloads as-is and references as `base - pos`.

use crate::decoder::Decoder;
use crate::dynamic::DynamicAccessor;
use dato_format::constants::{ARRAY_ENTRY_BYTES, MAP_ENTRY_BYTES};
use dato_format::{is_reference_type, AdaptiveConfig, DatoError, Result, SizeCategory, SizeStrategy};
use std::cmp::Ordering;
use std::ffi::CStr;

/// Position and entry layout of an opened container
#[derive(Debug, Clone, Copy)]
struct Extent {
    /// Position of the entry count
    start: usize,
    /// Position right after the entry count
    base: usize,
    len: usize,
}

/// Read entry `index` of a container whose value slots start at `slots` and
/// type bytes at `types`.
///
/// A reference must point before the container itself, which rules out
/// cycles in malformed buffers.
fn read_entry<'a, S: SizeStrategy>(
    dec: &Decoder<'a, S>,
    extent: Extent,
    slots: usize,
    types: usize,
    index: usize,
) -> Result<DynamicAccessor<'a, S>> {
    let raw = dec.read::<u32>(slots + index * 4)?;
    let tag = dec.read::<u8>(types + index)?;
    let payload = if is_reference_type(tag) {
        let payload = (extent.base as u32)
            .checked_sub(raw)
            .ok_or_else(|| DatoError::out_of_bounds(raw as usize, 0, dec.len()))?;
        if payload as usize >= extent.start {
            return Err(DatoError::ForwardReference {
                position: payload,
                base: extent.start as u32,
            });
        }
        payload
    } else {
        raw
    };
    Ok(DynamicAccessor::new(*dec, payload, tag))
}

fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(DatoError::IndexOutOfRange { index, len })
    }
}

/// Read the entry count at `pos` and check the entries fit the buffer.
fn open_container<S: SizeStrategy>(
    dec: &Decoder<'_, S>,
    category: SizeCategory,
    pos: u32,
    entry_bytes: usize,
) -> Result<Extent> {
    let start = pos as usize;
    let mut base = start;
    let len = dec.read_size(category, &mut base)? as usize;
    dec.expect_extent(base, len, entry_bytes)?;
    Ok(Extent { start, base, len })
}

/// Map keyed by byte strings
#[derive(Debug, Clone, Copy)]
pub struct StringMapAccessor<'a, S: SizeStrategy = AdaptiveConfig> {
    dec: Decoder<'a, S>,
    extent: Extent,
}

impl<'a, S: SizeStrategy> StringMapAccessor<'a, S> {
    pub(crate) fn new(dec: Decoder<'a, S>, pos: u32) -> Result<Self> {
        let extent = open_container(&dec, SizeCategory::MapSize, pos, MAP_ENTRY_BYTES)?;
        Ok(Self { dec, extent })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.extent.len
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.extent.len == 0
    }

    /// Key bytes of entry `index`, terminator excluded
    pub fn key_at(&self, index: usize) -> Result<&'a [u8]> {
        check_index(index, self.extent.len)?;
        self.key_unchecked_index(index)
    }

    /// Key of entry `index` as UTF-8
    pub fn key_str_at(&self, index: usize) -> Result<&'a str> {
        std::str::from_utf8(self.key_at(index)?).map_err(|_| DatoError::InvalidUtf8)
    }

    fn key_unchecked_index(&self, index: usize) -> Result<&'a [u8]> {
        let mut pos = self.dec.read::<u32>(self.extent.base + index * 4)? as usize;
        let len = self.dec.read_size(SizeCategory::KeyLength, &mut pos)? as usize;
        // The terminator must be inside the buffer too.
        let with_terminator = self.dec.bytes(pos, len + 1)?;
        Ok(&with_terminator[..len])
    }

    /// Value of entry `index`
    pub fn value_at(&self, index: usize) -> Result<DynamicAccessor<'a, S>> {
        check_index(index, self.extent.len)?;
        self.value_unchecked_index(index)
    }

    /// Value of entry `index`, or `None` past the end
    pub fn try_value_at(&self, index: usize) -> Result<Option<DynamicAccessor<'a, S>>> {
        if index >= self.extent.len {
            return Ok(None);
        }
        self.value_unchecked_index(index).map(Some)
    }

    fn value_unchecked_index(&self, index: usize) -> Result<DynamicAccessor<'a, S>> {
        let slots = self.extent.base + self.extent.len * 4;
        let types = self.extent.base + self.extent.len * 8;
        read_entry(&self.dec, self.extent, slots, types, index)
    }

    /// Look a key up by its bytes.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<DynamicAccessor<'a, S>>> {
        let key = key.as_ref();
        self.find(|stored| key.cmp(stored))
    }

    /// Look a key up by a zero-terminated string. Stored keys compare up to
    /// their first zero byte.
    pub fn get_cstr(&self, key: &CStr) -> Result<Option<DynamicAccessor<'a, S>>> {
        let key = key.to_bytes();
        self.find(|stored| {
            let end = stored.iter().position(|b| *b == 0).unwrap_or(stored.len());
            key.cmp(&stored[..end])
        })
    }

    /// Binary search on sorted buffers, linear scan otherwise. `compare`
    /// orders the query against a stored key.
    fn find(
        &self,
        compare: impl Fn(&[u8]) -> Ordering,
    ) -> Result<Option<DynamicAccessor<'a, S>>> {
        if self.dec.sorted_keys() {
            let (mut lo, mut hi) = (0, self.extent.len);
            while lo < hi {
                let mid = (lo + hi) / 2;
                match compare(self.key_unchecked_index(mid)?) {
                    Ordering::Equal => return self.value_unchecked_index(mid).map(Some),
                    Ordering::Less => hi = mid,
                    Ordering::Greater => lo = mid + 1,
                }
            }
        } else {
            for i in 0..self.extent.len {
                if compare(self.key_unchecked_index(i)?) == Ordering::Equal {
                    return self.value_unchecked_index(i).map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Entries in stored order
    pub fn iter(&self) -> impl Iterator<Item = Result<(&'a [u8], DynamicAccessor<'a, S>)>> + 'a {
        let map = *self;
        (0..self.extent.len).map(move |i| Ok((map.key_unchecked_index(i)?, map.value_unchecked_index(i)?)))
    }
}

/// Map keyed by `u32`
#[derive(Debug, Clone, Copy)]
pub struct IntMapAccessor<'a, S: SizeStrategy = AdaptiveConfig> {
    dec: Decoder<'a, S>,
    extent: Extent,
}

impl<'a, S: SizeStrategy> IntMapAccessor<'a, S> {
    pub(crate) fn new(dec: Decoder<'a, S>, pos: u32) -> Result<Self> {
        let extent = open_container(&dec, SizeCategory::MapSize, pos, MAP_ENTRY_BYTES)?;
        Ok(Self { dec, extent })
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.extent.len
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.extent.len == 0
    }

    /// Key of entry `index`
    pub fn key_at(&self, index: usize) -> Result<u32> {
        check_index(index, self.extent.len)?;
        self.dec.read::<u32>(self.extent.base + index * 4)
    }

    /// Value of entry `index`
    pub fn value_at(&self, index: usize) -> Result<DynamicAccessor<'a, S>> {
        check_index(index, self.extent.len)?;
        self.value_unchecked_index(index)
    }

    /// Value of entry `index`, or `None` past the end
    pub fn try_value_at(&self, index: usize) -> Result<Option<DynamicAccessor<'a, S>>> {
        if index >= self.extent.len {
            return Ok(None);
        }
        self.value_unchecked_index(index).map(Some)
    }

    fn value_unchecked_index(&self, index: usize) -> Result<DynamicAccessor<'a, S>> {
        let slots = self.extent.base + self.extent.len * 4;
        let types = self.extent.base + self.extent.len * 8;
        read_entry(&self.dec, self.extent, slots, types, index)
    }

    /// Look a key up.
    pub fn get(&self, key: u32) -> Result<Option<DynamicAccessor<'a, S>>> {
        if self.dec.sorted_keys() {
            let (mut lo, mut hi) = (0, self.extent.len);
            while lo < hi {
                let mid = (lo + hi) / 2;
                let stored = self.dec.read::<u32>(self.extent.base + mid * 4)?;
                match key.cmp(&stored) {
                    Ordering::Equal => return self.value_unchecked_index(mid).map(Some),
                    Ordering::Less => hi = mid,
                    Ordering::Greater => lo = mid + 1,
                }
            }
        } else {
            for i in 0..self.extent.len {
                if self.dec.read::<u32>(self.extent.base + i * 4)? == key {
                    return self.value_unchecked_index(i).map(Some);
                }
            }
        }
        Ok(None)
    }

    /// Entries in stored order
    pub fn iter(&self) -> impl Iterator<Item = Result<(u32, DynamicAccessor<'a, S>)>> + 'a {
        let map = *self;
        (0..self.extent.len).map(move |i| {
            let key = map.dec.read::<u32>(map.extent.base + i * 4)?;
            Ok((key, map.value_unchecked_index(i)?))
        })
    }
}

/// Array of values
#[derive(Debug, Clone, Copy)]
pub struct ArrayAccessor<'a, S: SizeStrategy = AdaptiveConfig> {
    dec: Decoder<'a, S>,
    extent: Extent,
}

impl<'a, S: SizeStrategy> ArrayAccessor<'a, S> {
    pub(crate) fn new(dec: Decoder<'a, S>, pos: u32) -> Result<Self> {
        let extent = open_container(&dec, SizeCategory::ArrayLength, pos, ARRAY_ENTRY_BYTES)?;
        Ok(Self { dec, extent })
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.extent.len
    }

    /// Whether the array has no elements
    pub fn is_empty(&self) -> bool {
        self.extent.len == 0
    }

    /// Element `index`
    pub fn get(&self, index: usize) -> Result<DynamicAccessor<'a, S>> {
        check_index(index, self.extent.len)?;
        self.get_unchecked_index(index)
    }

    /// Element `index`, or `None` past the end
    pub fn try_get(&self, index: usize) -> Result<Option<DynamicAccessor<'a, S>>> {
        if index >= self.extent.len {
            return Ok(None);
        }
        self.get_unchecked_index(index).map(Some)
    }

    fn get_unchecked_index(&self, index: usize) -> Result<DynamicAccessor<'a, S>> {
        let types = self.extent.base + self.extent.len * 4;
        read_entry(&self.dec, self.extent, self.extent.base, types, index)
    }

    /// Elements in order
    pub fn iter(&self) -> impl Iterator<Item = Result<DynamicAccessor<'a, S>>> + 'a {
        let array = *self;
        (0..self.extent.len).map(move |i| array.get_unchecked_index(i))
    }
}

//! Value and key handles returned by the encoder

use dato_format::TypeTag;

/// Handle to one encoded value
///
/// For embedded types the payload is the value's bit pattern; for reference
/// types it is the absolute buffer offset of the value's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueRef {
    /// Type of the value
    pub tag: TypeTag,
    /// Embedded bits or absolute offset
    pub payload: u32,
}

impl ValueRef {
    /// Create a handle
    pub fn new(tag: TypeTag, payload: u32) -> Self {
        Self { tag, payload }
    }

    /// Whether the payload is an offset
    pub fn is_reference(&self) -> bool {
        self.tag.is_reference()
    }
}

/// Handle to a map key
///
/// String keys record where their length field and bytes live; int keys
/// carry the key itself in `pos` and leave the rest zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRef {
    /// Absolute position of the key length field (int keys: the key)
    pub pos: u32,
    /// Absolute position of the first key byte
    pub data_pos: u32,
    /// Key length in bytes, terminator excluded
    pub len: u32,
}

impl KeyRef {
    /// Int map key
    pub fn int(key: u32) -> Self {
        Self {
            pos: key,
            data_pos: 0,
            len: 0,
        }
    }

    /// Byte range of the key inside the encoder buffer
    pub fn data_range(&self) -> std::ops::Range<usize> {
        let start = self.data_pos as usize;
        start..start.saturating_add(self.len as usize)
    }
}

/// One string map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMapEntry {
    /// Key written with `write_string_key`
    pub key: KeyRef,
    /// Value handle
    pub value: ValueRef,
}

/// One int map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntMapEntry {
    /// Integer key
    pub key: u32,
    /// Value handle
    pub value: ValueRef,
}

impl StringMapEntry {
    /// Pair a key with a value
    pub fn new(key: KeyRef, value: ValueRef) -> Self {
        Self { key, value }
    }
}

impl IntMapEntry {
    /// Pair a key with a value
    pub fn new(key: u32, value: ValueRef) -> Self {
        Self { key, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_data_range() {
        let key = KeyRef {
            pos: 20,
            data_pos: 24,
            len: 3,
        };
        assert_eq!(key.data_range(), 24..27);
        assert!(KeyRef::int(7).data_range().is_empty());

        let crafted = KeyRef {
            pos: 0,
            data_pos: u32::MAX,
            len: u32::MAX,
        };
        let range = crafted.data_range();
        assert_eq!(range.start, u32::MAX as usize);
        assert!(range.end >= range.start);
        assert!(b"short".get(range).is_none());
    }
}

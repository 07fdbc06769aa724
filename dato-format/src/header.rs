//! Buffer header
//!
//! Layout: `prefix`, `config id: u8`, `flags: u8`, `root type: u8`, zero
//! padding to a 4-byte boundary when aligned, `root offset: u32`.

use crate::buffer::{round_up, AppendBuffer};
use crate::constants::{FLAG_ALIGNED, FLAG_SORTED_KEYS};
use crate::error::{DatoError, Result as DatoResult};
use crate::primitive::read_at;

/// Decoded buffer header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Size strategy id
    pub config_id: u8,
    /// Buffer flags
    pub flags: u8,
    /// Type tag of the root value
    pub root_type: u8,
    /// Root payload (embedded value or absolute offset)
    pub root_offset: u32,
}

/// Positions of the header fields patched once the root is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSlots {
    /// Position of the root type byte
    pub root_type_pos: usize,
    /// Position of the root offset field
    pub root_offset_pos: usize,
}

/// Offset of the root offset field for a prefix length and flags.
pub fn root_offset_position(prefix_len: usize, flags: u8) -> usize {
    let pos = prefix_len + 3;
    if flags & FLAG_ALIGNED != 0 {
        round_up(pos, 4)
    } else {
        pos
    }
}

impl Header {
    /// Write a header with zeroed root fields into an empty buffer.
    pub fn reserve(buf: &mut AppendBuffer, prefix: &[u8], config_id: u8, flags: u8) -> HeaderSlots {
        buf.push_bytes(prefix);
        buf.push_byte(config_id);
        buf.push_byte(flags);

        let root_type_pos = buf.len();
        buf.push_byte(0);

        if flags & FLAG_ALIGNED != 0 {
            buf.zero_fill_to(round_up(buf.len(), 4));
        }
        let root_offset_pos = buf.len();
        buf.zero_fill(4);

        HeaderSlots {
            root_type_pos,
            root_offset_pos,
        }
    }

    /// Fill in the root fields reserved by [`Header::reserve`].
    pub fn patch_root(
        buf: &mut AppendBuffer,
        slots: HeaderSlots,
        root_type: u8,
        root_offset: u32,
    ) -> DatoResult<()> {
        buf.patch(slots.root_type_pos, &[root_type])?;
        buf.patch(slots.root_offset_pos, &root_offset.to_le_bytes())
    }

    /// Decode the header of `bytes`, which must start with `prefix`.
    pub fn decode(bytes: &[u8], prefix: &[u8]) -> DatoResult<Self> {
        let fixed_end = prefix.len() + 3;
        if bytes.len() < fixed_end {
            return Err(DatoError::UnexpectedEof);
        }
        if &bytes[..prefix.len()] != prefix {
            return Err(DatoError::InvalidMagic);
        }

        let config_id = bytes[prefix.len()];
        let flags = bytes[prefix.len() + 1];
        let root_type = bytes[prefix.len() + 2];

        let root_pos = root_offset_position(prefix.len(), flags);
        let root_offset = read_at::<u32>(bytes, root_pos).map_err(|_| DatoError::UnexpectedEof)?;

        Ok(Self {
            config_id,
            flags,
            root_type,
            root_offset,
        })
    }

    /// Check if the aligned flag is set
    pub fn aligned(&self) -> bool {
        self.flags & FLAG_ALIGNED != 0
    }

    /// Check if the sorted keys flag is set
    pub fn sorted_keys(&self) -> bool {
        self.flags & FLAG_SORTED_KEYS != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;

    #[test]
    fn test_header_roundtrip_aligned() {
        let mut buf = AppendBuffer::new();
        let slots = Header::reserve(&mut buf, DEFAULT_PREFIX, 2, FLAG_ALIGNED | FLAG_SORTED_KEYS);
        assert_eq!(slots.root_type_pos, 6);
        assert_eq!(slots.root_offset_pos, 8);
        assert_eq!(buf.len(), 12);

        Header::patch_root(&mut buf, slots, TAG_STRING_MAP, 0x0102_0304).unwrap();
        let header = Header::decode(buf.as_slice(), DEFAULT_PREFIX).unwrap();
        assert_eq!(header.config_id, 2);
        assert!(header.aligned());
        assert!(header.sorted_keys());
        assert_eq!(header.root_type, TAG_STRING_MAP);
        assert_eq!(header.root_offset, 0x0102_0304);
    }

    #[test]
    fn test_header_unaligned_has_no_padding() {
        let mut buf = AppendBuffer::new();
        let slots = Header::reserve(&mut buf, DEFAULT_PREFIX, 0, 0);
        assert_eq!(slots.root_offset_pos, 7);
        assert_eq!(buf.len(), 11);

        let header = Header::decode(buf.as_slice(), DEFAULT_PREFIX).unwrap();
        assert!(!header.aligned());
        assert!(!header.sorted_keys());
    }

    #[test]
    fn test_header_custom_prefix() {
        let mut buf = AppendBuffer::new();
        Header::reserve(&mut buf, b"THEME1", 1, FLAG_ALIGNED);
        // 6 + 3 = 9, rounded up to 12
        assert_eq!(root_offset_position(6, FLAG_ALIGNED), 12);
        assert_eq!(buf.len(), 16);
        assert!(Header::decode(buf.as_slice(), b"THEME1").is_ok());
        match Header::decode(buf.as_slice(), DEFAULT_PREFIX) {
            Err(DatoError::InvalidMagic) => {}
            other => panic!("expected InvalidMagic, got {other:?}"),
        }
    }

    #[test]
    fn test_header_truncated() {
        match Header::decode(b"DATO", DEFAULT_PREFIX) {
            Err(DatoError::UnexpectedEof) => {}
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }

        let mut buf = AppendBuffer::new();
        Header::reserve(&mut buf, DEFAULT_PREFIX, 0, FLAG_ALIGNED);
        let truncated = &buf.as_slice()[..buf.len() - 1];
        assert!(matches!(
            Header::decode(truncated, DEFAULT_PREFIX),
            Err(DatoError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_header_empty_prefix() {
        let mut buf = AppendBuffer::new();
        Header::reserve(&mut buf, b"", 0, 0);
        assert_eq!(buf.len(), 7);
        assert!(Header::decode(buf.as_slice(), b"").is_ok());
    }
}

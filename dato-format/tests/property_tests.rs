//! Property-based tests for DATO format primitives

use dato_format::buffer::AppendBuffer;
use dato_format::config::{size_table, SizeEncoding};
use dato_format::primitive::read_at;
use dato_format::varint::{decode_short32, encode_short32, short32_len};
use dato_format::{AdaptiveConfig, SizeCategory, SizeStrategy};
use proptest::prelude::*;

fn any_encoding() -> impl Strategy<Value = SizeEncoding> {
    prop::sample::select(vec![
        SizeEncoding::Fixed8,
        SizeEncoding::Fixed16,
        SizeEncoding::Fixed32,
        SizeEncoding::Short32,
    ])
}

proptest! {
    #[test]
    fn short32_roundtrip_property(value in any::<u32>()) {
        let encoded = encode_short32(value);
        let (decoded, consumed) = decode_short32(&encoded).expect("Failed to decode short32");
        prop_assert_eq!(value, decoded);
        prop_assert_eq!(consumed, short32_len(value));
    }

    #[test]
    fn short32_size_property(value in any::<u32>()) {
        let encoded = encode_short32(value);
        if value < 255 {
            prop_assert_eq!(encoded.len(), 1);
        } else {
            prop_assert_eq!(encoded.len(), 5);
            prop_assert_eq!(encoded[0], 0xFF);
        }
    }

    #[test]
    fn size_write_read_property(
        encoding in any_encoding(),
        value in any::<u32>(),
        lead in 0usize..16,
        align in prop::sample::select(vec![0usize, 1, 2, 4, 8]),
    ) {
        let mut buf = AppendBuffer::new();
        buf.zero_fill(lead);
        let result = encoding.write(&mut buf, value as usize, align, &[]);

        if value > encoding.max_value() {
            prop_assert!(result.is_err());
            prop_assert_eq!(buf.len(), lead);
        } else {
            let pos = result.unwrap() as usize;
            prop_assert!(pos >= lead);
            let mut cursor = pos;
            let decoded = encoding.read(buf.as_slice(), &mut cursor).unwrap();
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(cursor, buf.len());
            if align > 1 {
                prop_assert_eq!(buf.len() % align, 0);
            }
        }
    }

    #[test]
    fn adaptive_resolution_property(id in any::<u8>()) {
        match AdaptiveConfig::resolve(id) {
            Ok(config) => {
                let table = size_table(id).unwrap();
                prop_assert_eq!(config.encoding(SizeCategory::ValueLength), table[3]);
                prop_assert!(id <= 2);
            }
            Err(_) => prop_assert!(size_table(id).is_none()),
        }
    }

    #[test]
    fn unaligned_scalar_read_property(lead in 0usize..8, value in any::<u64>()) {
        let mut buf = AppendBuffer::new();
        buf.zero_fill(lead);
        buf.push_le(value);
        prop_assert_eq!(read_at::<u64>(buf.as_slice(), lead).unwrap(), value);
    }
}

#![no_main]

use dato_format::varint::{decode_short32, encode_short32, short32_len};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u32, &[u8])| {
    let (value, bytes) = input;

    let encoded = encode_short32(value);
    assert_eq!(encoded.len(), short32_len(value));
    let (decoded, used) = decode_short32(&encoded).expect("encoded size must decode");
    assert_eq!((decoded, used), (value, encoded.len()));

    if let Ok((_, used)) = decode_short32(bytes) {
        assert!(used <= bytes.len());
    }
});

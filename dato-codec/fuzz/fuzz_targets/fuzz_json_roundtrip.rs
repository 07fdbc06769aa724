#![no_main]

use dato_codec::{encode_json, to_json, Compact, Decoder, Encoder, EncoderOptions};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|input: (bool, bool, &[u8])| {
    let (aligned, sorted_keys, text) = input;
    let Ok(value) = serde_json::from_slice::<Value>(text) else {
        return;
    };

    let options = EncoderOptions {
        aligned,
        sorted_keys,
        ..EncoderOptions::default()
    };
    let mut enc = Encoder::with_strategy(&options, Compact);
    let Ok(root) = encode_json(&mut enc, &value) else {
        return;
    };
    let bytes = enc.finish(root).expect("finish after successful encode");

    let dec = Decoder::open(&bytes).expect("encoder output must open");
    let decoded = to_json(&dec.root()).expect("encoder output must decode");
    assert_eq!(decoded, value);
});

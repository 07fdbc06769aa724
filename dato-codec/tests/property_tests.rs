//! Property-based tests for the encoder and decoder
//!
//! Round trips through JSON, lookup equivalence between sorted and unsorted
//! buffers, and robustness against arbitrary input bytes.

use dato_codec::{
    encode_json, to_json, Compact, Decoder, Encoder, EncoderOptions, IntMapEntry, StringMapEntry,
    Validation,
};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

fn any_options() -> impl Strategy<Value = EncoderOptions> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(aligned, sorted_keys, dedup)| {
        EncoderOptions {
            aligned,
            sorted_keys,
            skip_duplicate_keys: dedup,
            ..EncoderOptions::default()
        }
    })
}

fn any_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        (-1.0e12f64..1.0e12).prop_map(Value::from),
        "[a-z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{0,6}", inner, 0..8)
                .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

proptest! {
    #[test]
    fn json_roundtrip_property(value in any_json(), options in any_options(), compact in any::<bool>()) {
        let bytes = if compact {
            let mut enc = Encoder::with_strategy(&options, Compact);
            let root = encode_json(&mut enc, &value).unwrap();
            enc.finish(root).unwrap()
        } else {
            let mut enc = Encoder::new(&options);
            let root = encode_json(&mut enc, &value).unwrap();
            enc.finish(root).unwrap()
        };
        let dec = Decoder::open(&bytes).unwrap();
        prop_assert_eq!(to_json(&dec.root()).unwrap(), value);
    }

    #[test]
    fn string_lookup_matches_scan_property(
        keys in prop::collection::hash_set("[a-c]{0,5}", 0..80),
        missing in "[a-d]{0,6}",
        sorted_keys in any::<bool>(),
    ) {
        let options = EncoderOptions { sorted_keys, ..EncoderOptions::default() };
        let keys: Vec<String> = keys.into_iter().collect();
        let mut enc = Encoder::new(&options);
        let mut entries = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            let key = enc.write_string_key(key.as_bytes()).unwrap();
            entries.push(StringMapEntry::new(key, enc.write_u32(i as u32)));
        }
        let root = enc.write_string_map(&entries).unwrap();
        let bytes = enc.finish(root).unwrap();

        let dec = Decoder::open(&bytes).unwrap();
        let map = dec.root().as_string_map().unwrap();
        prop_assert_eq!(map.len(), keys.len());
        for (i, key) in keys.iter().enumerate() {
            let found = map.get(key).unwrap().map(|v| v.as_u32().unwrap());
            prop_assert_eq!(found, Some(i as u32));
        }

        let scanned = map
            .iter()
            .map(|entry| entry.unwrap())
            .find(|(key, _)| *key == missing.as_bytes())
            .map(|(_, value)| value.as_u32().unwrap());
        let looked_up = map.get(&missing).unwrap().map(|v| v.as_u32().unwrap());
        prop_assert_eq!(looked_up, scanned);

        if sorted_keys {
            let stored: Vec<&[u8]> = (0..map.len()).map(|i| map.key_at(i).unwrap()).collect();
            prop_assert!(stored.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn int_map_lookup_property(
        keys in prop::collection::hash_set(any::<u32>(), 0..200),
        probe in any::<u32>(),
        sorted_keys in any::<bool>(),
    ) {
        let options = EncoderOptions { sorted_keys, ..EncoderOptions::default() };
        let keys: Vec<u32> = keys.into_iter().collect();
        let mut enc = Encoder::with_strategy(&options, Compact);
        let entries: Vec<IntMapEntry> = keys
            .iter()
            .map(|&k| IntMapEntry::new(k, enc.write_u32(k ^ 0x5A5A_5A5A)))
            .collect();
        let root = enc.write_int_map(&entries).unwrap();
        let bytes = enc.finish(root).unwrap();

        let dec = Decoder::open(&bytes).unwrap();
        let map = dec.root().as_int_map().unwrap();
        for &k in &keys {
            prop_assert_eq!(map.get(k).unwrap().unwrap().as_u32().unwrap(), k ^ 0x5A5A_5A5A);
        }
        let present: HashSet<u32> = keys.iter().copied().collect();
        prop_assert_eq!(map.get(probe).unwrap().is_some(), present.contains(&probe));

        if sorted_keys {
            let stored: Vec<u32> = (0..map.len()).map(|i| map.key_at(i).unwrap()).collect();
            let expected: Vec<u32> = keys.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
            prop_assert_eq!(stored, expected);
        }
    }

    #[test]
    fn key_dedup_property(keys in prop::collection::vec("[a-z]{1,4}", 1..100)) {
        let mut enc = Encoder::new(&EncoderOptions::default());
        let refs: Vec<_> = keys
            .iter()
            .map(|key| enc.write_string_key(key.as_bytes()).unwrap())
            .collect();
        let distinct: HashSet<&String> = keys.iter().collect();
        prop_assert_eq!(enc.unique_key_count(), distinct.len());
        for (i, a) in keys.iter().enumerate() {
            for (j, b) in keys.iter().enumerate() {
                prop_assert_eq!(a == b, refs[i] == refs[j]);
            }
        }
    }

    #[test]
    fn arbitrary_bytes_never_panic(
        body in prop::collection::vec(any::<u8>(), 0..256),
        config in 0u8..3,
        flags in 0u8..4,
        root_type in 0u8..20,
        trusted in any::<bool>(),
    ) {
        let mut bytes = b"DATO".to_vec();
        bytes.extend_from_slice(&[config, flags, root_type]);
        bytes.extend_from_slice(&body);

        if let Ok(dec) = Decoder::open(&bytes) {
            let dec = if trusted { dec.with_validation(Validation::trusted()) } else { dec };
            let root = dec.root();
            let _ = to_json(&root);
            let _ = root.cast::<f64>();
            let _ = root.cast_bool();
            if let Ok(map) = root.as_string_map() {
                let _ = map.get("a");
            }
        }
    }
}

#![no_main]

use dato_codec::{to_json, Decoder, Validation, Visitor};
use libfuzzer_sys::fuzz_target;

struct Counter(usize);

impl Visitor for Counter {
    fn begin_array_index(&mut self, _index: usize) {
        self.0 += 1;
    }

    fn on_unknown(&mut self, _tag: u8, _payload: u32, _buffer: &[u8]) {
        self.0 += 1;
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(dec) = Decoder::open(data) else {
        return;
    };

    let root = dec.root();
    let _ = to_json(&root);
    let _ = root.visit(&mut Counter(0));
    let _ = root.cast::<i64>();

    if let Ok(map) = root.as_string_map() {
        let _ = map.get("id");
        let _ = map.get("");
    }
    if let Ok(map) = root.as_int_map() {
        let _ = map.get(0);
    }

    // Skipping bounds checks must still not read outside the slice.
    let trusted = dec.with_validation(Validation::trusted());
    let _ = to_json(&trusted.root());
});

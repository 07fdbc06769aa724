//! JSON conversion
//!
//! [`to_json`] walks a value with [`JsonBuilder`]; [`encode_json`] writes a
//! `serde_json::Value` tree bottom-up through an [`Encoder`].

use crate::dynamic::DynamicAccessor;
use crate::encoder::Encoder;
use crate::handle::{StringMapEntry, ValueRef};
use crate::typed::{json_float, RawVector, String16Accessor, String32Accessor};
use crate::visitor::Visitor;
use dato_format::{Result, SizeStrategy, TypeTag};
use serde_json::{Map, Value};
use smallvec::SmallVec;

enum Frame {
    Array(Vec<Value>),
    Object {
        map: Map<String, Value>,
        key: Option<String>,
    },
}

/// Visitor that builds a `serde_json::Value`
///
/// Int map keys become decimal strings. Non-finite floats and values of
/// unknown type become `null`.
#[derive(Default)]
pub struct JsonBuilder {
    stack: SmallVec<[Frame; 8]>,
    root: Option<Value>,
}

impl JsonBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// The completed value, or `null` if nothing was visited
    pub fn finish(self) -> Value {
        self.root.unwrap_or(Value::Null)
    }

    fn emit(&mut self, value: Value) {
        match self.stack.last_mut() {
            Some(Frame::Array(items)) => items.push(value),
            Some(Frame::Object { map, key }) => {
                if let Some(key) = key.take() {
                    map.insert(key, value);
                }
            }
            None => self.root = Some(value),
        }
    }

    fn set_key(&mut self, name: String) {
        if let Some(Frame::Object { key, .. }) = self.stack.last_mut() {
            *key = Some(name);
        }
    }

    fn close(&mut self) {
        let value = match self.stack.pop() {
            Some(Frame::Array(items)) => Value::Array(items),
            Some(Frame::Object { map, .. }) => Value::Object(map),
            None => return,
        };
        self.emit(value);
    }
}

fn vector_rows(raw: &RawVector<'_>) -> Vec<Value> {
    let width = raw.elem_count as usize;
    (0..raw.vector_count)
        .map(|row| {
            let values = (row * width..(row + 1) * width)
                .map(|i| raw.get_json(i).unwrap_or(Value::Null))
                .collect();
            Value::Array(values)
        })
        .collect()
}

impl Visitor for JsonBuilder {
    fn begin_map(&mut self, _kind: TypeTag, _len: usize) {
        self.stack.push(Frame::Object {
            map: Map::new(),
            key: None,
        });
    }

    fn end_map(&mut self, _kind: TypeTag) {
        self.close();
    }

    fn begin_string_key(&mut self, key: &[u8]) {
        self.set_key(String::from_utf8_lossy(key).into_owned());
    }

    fn begin_int_key(&mut self, key: u32) {
        self.set_key(key.to_string());
    }

    fn begin_array(&mut self, len: usize) {
        // Unvalidated buffers may claim any length.
        self.stack.push(Frame::Array(Vec::with_capacity(len.min(4096))));
    }

    fn end_array(&mut self) {
        self.close();
    }

    fn null(&mut self) {
        self.emit(Value::Null);
    }

    fn bool(&mut self, value: bool) {
        self.emit(Value::Bool(value));
    }

    fn i32(&mut self, value: i32) {
        self.emit(value.into());
    }

    fn u32(&mut self, value: u32) {
        self.emit(value.into());
    }

    fn f32(&mut self, value: f32) {
        self.emit(json_float(value as f64));
    }

    fn i64(&mut self, value: i64) {
        self.emit(value.into());
    }

    fn u64(&mut self, value: u64) {
        self.emit(value.into());
    }

    fn f64(&mut self, value: f64) {
        self.emit(json_float(value));
    }

    fn string8(&mut self, value: &[u8]) {
        self.emit(Value::String(String::from_utf8_lossy(value).into_owned()));
    }

    fn string16(&mut self, value: String16Accessor<'_>) {
        self.emit(Value::String(value.to_string_lossy()));
    }

    fn string32(&mut self, value: String32Accessor<'_>) {
        self.emit(Value::String(value.to_string_lossy()));
    }

    fn byte_array(&mut self, value: &[u8]) {
        self.emit(Value::Array(value.iter().map(|&b| b.into()).collect()));
    }

    fn vector(&mut self, value: RawVector<'_>) {
        let row = vector_rows(&value).pop().unwrap_or(Value::Array(Vec::new()));
        self.emit(row);
    }

    fn vector_array(&mut self, value: RawVector<'_>) {
        self.emit(Value::Array(vector_rows(&value)));
    }

    fn on_unknown(&mut self, _tag: u8, _payload: u32, _buffer: &[u8]) {
        self.emit(Value::Null);
    }
}

/// Convert a value and everything below it to JSON.
pub fn to_json<S: SizeStrategy>(value: &DynamicAccessor<'_, S>) -> Result<Value> {
    let mut builder = JsonBuilder::new();
    value.visit(&mut builder)?;
    Ok(builder.finish())
}

/// Write a JSON tree, children before parents.
///
/// Integers that fit `i32` become Int32, other signed integers Int64,
/// unsigned integers beyond `i64` UInt64, and every other number Float64.
/// Strings become String8 and objects string maps.
pub fn encode_json<S: SizeStrategy>(enc: &mut Encoder<S>, value: &Value) -> Result<ValueRef> {
    match value {
        Value::Null => Ok(enc.write_null()),
        Value::Bool(b) => Ok(enc.write_bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                match i32::try_from(i) {
                    Ok(small) => Ok(enc.write_i32(small)),
                    Err(_) => enc.write_i64(i),
                }
            } else if let Some(u) = n.as_u64() {
                enc.write_u64(u)
            } else {
                enc.write_f64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => enc.write_str(s),
        Value::Array(items) => {
            let values = items
                .iter()
                .map(|item| encode_json(enc, item))
                .collect::<Result<Vec<_>>>()?;
            enc.write_array(&values)
        }
        Value::Object(map) => {
            let mut entries = Vec::with_capacity(map.len());
            for (key, item) in map {
                let value = encode_json(enc, item)?;
                let key = enc.write_string_key(key.as_bytes())?;
                entries.push(StringMapEntry::new(key, value));
            }
            enc.write_string_map_in_place(&mut entries)
        }
    }
}

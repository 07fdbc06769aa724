//! Append-only encoder
//!
//! Values are written leaves first. Every write returns a handle; containers
//! are written from handles of values that already exist in the buffer, and
//! the last container becomes the root passed to [`Encoder::finish`].

use crate::handle::{IntMapEntry, KeyRef, StringMapEntry, ValueRef};
use crate::key_table::KeyTable;
use crate::sort::{sort_int_entries, sort_string_entries};
use crate::EncoderOptions;
use dato_format::buffer::round_up;
use dato_format::constants::MAX_VECTOR_ELEMENTS;
use dato_format::{
    AppendBuffer, DatoError, FixedSizes, Header, HeaderSlots, Primitive, Result, SizeCategory,
    SizeStrategy, TypeTag,
};
use tracing::debug;

/// Buffer builder, generic over the size strategy
#[derive(Debug)]
pub struct Encoder<S: SizeStrategy = FixedSizes> {
    buf: AppendBuffer,
    strategy: S,
    flags: u8,
    skip_duplicate_keys: bool,
    header: HeaderSlots,
    keys: KeyTable,
    string_scratch: Vec<StringMapEntry>,
    int_scratch: Vec<IntMapEntry>,
    radix_scratch: Vec<IntMapEntry>,
}

impl Encoder<FixedSizes> {
    /// Create an encoder using 4-byte size fields throughout.
    pub fn new(options: &EncoderOptions) -> Self {
        Self::with_strategy(options, FixedSizes)
    }
}

impl<S: SizeStrategy> Encoder<S> {
    /// Create an encoder with an explicit size strategy and write the header.
    pub fn with_strategy(options: &EncoderOptions, strategy: S) -> Self {
        let flags = options.flags();
        let mut buf = AppendBuffer::with_capacity(256);
        let header = Header::reserve(&mut buf, options.prefix.as_bytes(), strategy.id(), flags);
        Self {
            buf,
            strategy,
            flags,
            skip_duplicate_keys: options.skip_duplicate_keys,
            header,
            keys: KeyTable::new(),
            string_scratch: Vec::new(),
            int_scratch: Vec::new(),
            radix_scratch: Vec::new(),
        }
    }

    /// Size strategy in use
    pub fn strategy(&self) -> S {
        self.strategy
    }

    /// Header flags
    pub fn flags(&self) -> u8 {
        self.flags
    }

    /// Whether padding is inserted for natural alignment
    pub fn aligned(&self) -> bool {
        self.flags & dato_format::constants::FLAG_ALIGNED != 0
    }

    /// Whether map entries are sorted before writing
    pub fn sorted_keys(&self) -> bool {
        self.flags & dato_format::constants::FLAG_SORTED_KEYS != 0
    }

    /// Bytes written so far, header included
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always false; the header is written on construction.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes written so far; the root fields are still zero.
    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    /// Number of distinct keys in the dedup table
    pub fn unique_key_count(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    fn align(&self, align: usize) -> usize {
        if self.aligned() {
            align
        } else {
            0
        }
    }

    // Embedded scalars

    /// Null value
    pub fn write_null(&self) -> ValueRef {
        ValueRef::new(TypeTag::Null, 0)
    }

    /// Boolean value
    pub fn write_bool(&self, value: bool) -> ValueRef {
        ValueRef::new(TypeTag::Bool, value as u32)
    }

    /// Signed 32-bit integer
    pub fn write_i32(&self, value: i32) -> ValueRef {
        ValueRef::new(TypeTag::Int32, value as u32)
    }

    /// Unsigned 32-bit integer
    pub fn write_u32(&self, value: u32) -> ValueRef {
        ValueRef::new(TypeTag::UInt32, value)
    }

    /// 32-bit float, stored by bit pattern
    pub fn write_f32(&self, value: f32) -> ValueRef {
        ValueRef::new(TypeTag::Float32, value.to_bits())
    }

    // Referenced scalars

    fn write_value8(&mut self, tag: TypeTag, bytes: [u8; 8]) -> Result<ValueRef> {
        if self.aligned() {
            self.buf.zero_fill_to(round_up(self.buf.len(), 8));
        }
        let pos = self.buf.position()?;
        self.buf.push_bytes(&bytes);
        Ok(ValueRef::new(tag, pos))
    }

    /// Signed 64-bit integer
    pub fn write_i64(&mut self, value: i64) -> Result<ValueRef> {
        self.write_value8(TypeTag::Int64, value.to_le_bytes())
    }

    /// Unsigned 64-bit integer
    pub fn write_u64(&mut self, value: u64) -> Result<ValueRef> {
        self.write_value8(TypeTag::UInt64, value.to_le_bytes())
    }

    /// 64-bit float
    pub fn write_f64(&mut self, value: f64) -> Result<ValueRef> {
        self.write_value8(TypeTag::Float64, value.to_le_bytes())
    }

    // Strings and byte arrays

    /// UTF-8 string
    pub fn write_str(&mut self, value: &str) -> Result<ValueRef> {
        self.write_string8(value.as_bytes())
    }

    /// 8-bit string: length, bytes, one terminating zero
    pub fn write_string8(&mut self, bytes: &[u8]) -> Result<ValueRef> {
        let pos = self
            .strategy
            .write_size(SizeCategory::ValueLength, &mut self.buf, bytes.len(), 0, &[])?;
        self.buf.push_bytes(bytes);
        self.buf.push_byte(0);
        Ok(ValueRef::new(TypeTag::String8, pos))
    }

    /// 16-bit string; the length counts units, not bytes.
    pub fn write_string16(&mut self, units: &[u16]) -> Result<ValueRef> {
        let align = self.align(2);
        let pos = self
            .strategy
            .write_size(SizeCategory::ValueLength, &mut self.buf, units.len(), align, &[])?;
        self.buf.push_le_slice(units);
        self.buf.zero_fill(2);
        Ok(ValueRef::new(TypeTag::String16, pos))
    }

    /// 32-bit string; the length counts units, not bytes.
    pub fn write_string32(&mut self, units: &[u32]) -> Result<ValueRef> {
        let align = self.align(4);
        let pos = self
            .strategy
            .write_size(SizeCategory::ValueLength, &mut self.buf, units.len(), align, &[])?;
        self.buf.push_le_slice(units);
        self.buf.zero_fill(4);
        Ok(ValueRef::new(TypeTag::String32, pos))
    }

    /// Raw bytes with no alignment
    pub fn write_byte_array(&mut self, bytes: &[u8]) -> Result<ValueRef> {
        self.write_byte_array_aligned(bytes, 0)
    }

    /// Raw bytes whose first byte lands on a multiple of `align`.
    ///
    /// The alignment applies whether or not the buffer is flagged aligned.
    pub fn write_byte_array_aligned(&mut self, bytes: &[u8], align: usize) -> Result<ValueRef> {
        let pos = self
            .strategy
            .write_size(SizeCategory::ValueLength, &mut self.buf, bytes.len(), align, &[])?;
        self.buf.push_bytes(bytes);
        Ok(ValueRef::new(TypeTag::ByteArray, pos))
    }

    // Vectors

    /// One vector of 1 to 255 elements: subtype, count, data.
    pub fn write_vector<T: Primitive>(&mut self, values: &[T]) -> Result<ValueRef> {
        let count = checked_element_count(values.len())?;
        if self.aligned() {
            self.buf.zero_fill_to(round_up(self.buf.len() + 2, T::SIZE) - 2);
        }
        let pos = self.buf.position()?;
        self.buf.push_byte(T::SUBTYPE as u8);
        self.buf.push_byte(count);
        self.buf.push_le_slice(values);
        Ok(ValueRef::new(TypeTag::Vector, pos))
    }

    /// A run of vectors of `elem_count` elements each, stored flat in `values`.
    pub fn write_vector_array<T: Primitive>(
        &mut self,
        values: &[T],
        elem_count: usize,
    ) -> Result<ValueRef> {
        let count = checked_element_count(elem_count)?;
        if values.len() % elem_count != 0 {
            return Err(DatoError::InvalidElementCount(elem_count));
        }
        let vectors = values.len() / elem_count;
        let align = self.align(if vectors > 0 { T::SIZE } else { 1 });
        let pos = self.strategy.write_size(
            SizeCategory::ValueLength,
            &mut self.buf,
            vectors,
            align,
            &[T::SUBTYPE as u8, count],
        )?;
        self.buf.push_le_slice(values);
        Ok(ValueRef::new(TypeTag::VectorArray, pos))
    }

    // Keys

    /// Write a string map key, reusing an identical earlier key when
    /// duplicate skipping is on.
    pub fn write_string_key(&mut self, key: &[u8]) -> Result<KeyRef> {
        if self.skip_duplicate_keys {
            if let Some(existing) = self.keys.find(self.buf.as_slice(), key) {
                return Ok(existing);
            }
        }

        let pos = self
            .strategy
            .write_size(SizeCategory::KeyLength, &mut self.buf, key.len(), 0, &[])?;
        let data_pos = self.buf.position()?;
        self.buf.push_bytes(key);
        self.buf.push_byte(0);

        let key = KeyRef {
            pos,
            data_pos,
            len: key.len() as u32,
        };
        if self.skip_duplicate_keys {
            self.keys.insert(self.buf.as_slice(), key);
        }
        Ok(key)
    }

    /// Key handle for an int map
    pub fn int_key(&self, key: u32) -> KeyRef {
        KeyRef::int(key)
    }

    // Containers

    /// String map; entries are sorted on a scratch copy when the buffer is
    /// flagged sorted.
    pub fn write_string_map(&mut self, entries: &[StringMapEntry]) -> Result<ValueRef> {
        if !self.sorted_keys() {
            return self.write_string_map_entries(entries);
        }
        let mut sorted = std::mem::take(&mut self.string_scratch);
        sorted.clear();
        sorted.extend_from_slice(entries);
        sort_string_entries(self.buf.as_slice(), &mut sorted);
        let result = self.write_string_map_entries(&sorted);
        self.string_scratch = sorted;
        result
    }

    /// String map; sorts the caller's entries in place when the buffer is
    /// flagged sorted.
    pub fn write_string_map_in_place(&mut self, entries: &mut [StringMapEntry]) -> Result<ValueRef> {
        if self.sorted_keys() {
            sort_string_entries(self.buf.as_slice(), entries);
        }
        self.write_string_map_entries(entries)
    }

    /// Int map; entries are sorted on a scratch copy when the buffer is
    /// flagged sorted.
    pub fn write_int_map(&mut self, entries: &[IntMapEntry]) -> Result<ValueRef> {
        if !self.sorted_keys() {
            return self.write_int_map_entries(entries);
        }
        let mut sorted = std::mem::take(&mut self.int_scratch);
        sorted.clear();
        sorted.extend_from_slice(entries);
        sort_int_entries(&mut sorted, &mut self.radix_scratch);
        let result = self.write_int_map_entries(&sorted);
        self.int_scratch = sorted;
        result
    }

    /// Int map; sorts the caller's entries in place when the buffer is
    /// flagged sorted.
    pub fn write_int_map_in_place(&mut self, entries: &mut [IntMapEntry]) -> Result<ValueRef> {
        if self.sorted_keys() {
            sort_int_entries(entries, &mut self.radix_scratch);
        }
        self.write_int_map_entries(entries)
    }

    /// Array of values in the given order
    pub fn write_array(&mut self, values: &[ValueRef]) -> Result<ValueRef> {
        self.check_references(values.iter().copied())?;
        let (pos, base) = self.begin_container(SizeCategory::ArrayLength, values.len())?;
        self.write_slots(base, values.iter().copied());
        Ok(ValueRef::new(TypeTag::Array, pos))
    }

    fn write_string_map_entries(&mut self, entries: &[StringMapEntry]) -> Result<ValueRef> {
        self.check_references(entries.iter().map(|e| e.value))?;
        let (pos, base) = self.begin_container(SizeCategory::MapSize, entries.len())?;
        for entry in entries {
            self.buf.push_u32(entry.key.pos);
        }
        self.write_slots(base, entries.iter().map(|e| e.value));
        Ok(ValueRef::new(TypeTag::StringMap, pos))
    }

    fn write_int_map_entries(&mut self, entries: &[IntMapEntry]) -> Result<ValueRef> {
        self.check_references(entries.iter().map(|e| e.value))?;
        let (pos, base) = self.begin_container(SizeCategory::MapSize, entries.len())?;
        for entry in entries {
            self.buf.push_u32(entry.key);
        }
        self.write_slots(base, entries.iter().map(|e| e.value));
        Ok(ValueRef::new(TypeTag::IntMap, pos))
    }

    /// Every referenced value must already be in the buffer, which puts it
    /// before the base of the container about to be written.
    fn check_references(&self, values: impl Iterator<Item = ValueRef>) -> Result<()> {
        let end = self.buf.position()?;
        for value in values {
            if value.is_reference() && value.payload >= end {
                return Err(DatoError::ForwardReference {
                    position: value.payload,
                    base: end,
                });
            }
        }
        Ok(())
    }

    /// Write the entry count and return (container position, base).
    fn begin_container(&mut self, category: SizeCategory, count: usize) -> Result<(u32, u32)> {
        let align = self.align(4);
        let pos = self
            .strategy
            .write_size(category, &mut self.buf, count, align, &[])?;
        Ok((pos, self.buf.position()?))
    }

    fn write_slots(&mut self, base: u32, values: impl Iterator<Item = ValueRef> + Clone) {
        for value in values.clone() {
            let slot = if value.is_reference() {
                base - value.payload
            } else {
                value.payload
            };
            self.buf.push_u32(slot);
        }
        for value in values {
            self.buf.push_byte(value.tag as u8);
        }
    }

    /// Record `root` in the header and hand over the finished buffer.
    pub fn finish(mut self, root: ValueRef) -> Result<Vec<u8>> {
        if root.is_reference() && root.payload >= self.buf.position()? {
            return Err(DatoError::ForwardReference {
                position: root.payload,
                base: self.buf.position()?,
            });
        }
        Header::patch_root(&mut self.buf, self.header, root.tag as u8, root.payload)?;
        debug!(
            bytes = self.buf.len(),
            config = self.strategy.id(),
            flags = self.flags,
            unique_keys = self.keys.len(),
            root_type = ?root.tag,
            "finished buffer"
        );
        Ok(self.buf.into_vec())
    }
}

fn checked_element_count(count: usize) -> Result<u8> {
    if (1..=MAX_VECTOR_ELEMENTS).contains(&count) {
        Ok(count as u8)
    } else {
        Err(DatoError::InvalidElementCount(count))
    }
}

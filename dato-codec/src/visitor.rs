//! Generic depth-first traversal
//!
//! A [`Visitor`] receives one callback per leaf and a begin/end pair around
//! every container, map key and array index. Every method has an empty
//! default body, so implementations override only what they need.
//!
//! Tags this version does not know, and vectors with an unknown subtype, go
//! to [`Visitor::on_unknown`] with the raw tag, payload and whole buffer.

use crate::container::{ArrayAccessor, IntMapAccessor, StringMapAccessor};
use crate::dynamic::DynamicAccessor;
use crate::typed::{
    RawVector, String16Accessor, String32Accessor, TypedArrayAccessor, VectorAccessor,
    VectorArrayAccessor,
};
use dato_format::constants::*;
use dato_format::{DatoError, Primitive, Result, SizeCategory, SizeStrategy, Subtype, TypeTag};

/// Callbacks for [`DynamicAccessor::visit`] and the container `visit` methods
#[allow(unused_variables)]
pub trait Visitor {
    /// Start of a string map or int map with `len` entries
    fn begin_map(&mut self, kind: TypeTag, len: usize) {}
    /// End of a map
    fn end_map(&mut self, kind: TypeTag) {}
    /// Start of a string map entry; the value follows
    fn begin_string_key(&mut self, key: &[u8]) {}
    /// End of a string map entry
    fn end_string_key(&mut self, key: &[u8]) {}
    /// Start of an int map entry; the value follows
    fn begin_int_key(&mut self, key: u32) {}
    /// End of an int map entry
    fn end_int_key(&mut self, key: u32) {}
    /// Start of an array with `len` elements
    fn begin_array(&mut self, len: usize) {}
    /// End of an array
    fn end_array(&mut self) {}
    /// Start of array element `index`
    fn begin_array_index(&mut self, index: usize) {}
    /// End of array element `index`
    fn end_array_index(&mut self, index: usize) {}

    /// Null
    fn null(&mut self) {}
    /// Boolean
    fn bool(&mut self, value: bool) {}
    /// Signed 32-bit integer
    fn i32(&mut self, value: i32) {}
    /// Unsigned 32-bit integer
    fn u32(&mut self, value: u32) {}
    /// 32-bit float
    fn f32(&mut self, value: f32) {}
    /// Signed 64-bit integer
    fn i64(&mut self, value: i64) {}
    /// Unsigned 64-bit integer
    fn u64(&mut self, value: u64) {}
    /// 64-bit float
    fn f64(&mut self, value: f64) {}
    /// 8-bit string bytes, terminator excluded
    fn string8(&mut self, value: &[u8]) {}
    /// 16-bit string
    fn string16(&mut self, value: String16Accessor<'_>) {}
    /// 32-bit string
    fn string32(&mut self, value: String32Accessor<'_>) {}
    /// Byte array contents
    fn byte_array(&mut self, value: &[u8]) {}
    /// Single vector
    fn vector(&mut self, value: RawVector<'_>) {}
    /// Vector array
    fn vector_array(&mut self, value: RawVector<'_>) {}
    /// Value whose tag or vector subtype is not known
    fn on_unknown(&mut self, tag: u8, payload: u32, buffer: &[u8]) {}
}

impl<'a, S: SizeStrategy> DynamicAccessor<'a, S> {
    /// Walk this value and everything below it.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        let payload = self.payload();
        match self.tag() {
            TAG_NULL => visitor.null(),
            TAG_BOOL => visitor.bool(payload != 0),
            TAG_INT32 => visitor.i32(payload as i32),
            TAG_UINT32 => visitor.u32(payload),
            TAG_FLOAT32 => visitor.f32(f32::from_bits(payload)),
            TAG_INT64 => visitor.i64(self.as_i64()?),
            TAG_UINT64 => visitor.u64(self.as_u64()?),
            TAG_FLOAT64 => visitor.f64(self.as_f64()?),
            TAG_ARRAY => self.as_array()?.visit(visitor)?,
            TAG_STRING_MAP => self.as_string_map()?.visit(visitor)?,
            TAG_INT_MAP => self.as_int_map()?.visit(visitor)?,
            TAG_STRING8 => visitor.string8(self.as_string8()?.as_bytes()?),
            TAG_STRING16 => visitor.string16(self.as_string16()?),
            TAG_STRING32 => visitor.string32(self.as_string32()?),
            TAG_BYTE_ARRAY => visitor.byte_array(self.as_byte_array()?.as_bytes()?),
            TAG_VECTOR | TAG_VECTOR_ARRAY => match raw_vector(self)? {
                Some(raw) if self.tag() == TAG_VECTOR => visitor.vector(raw),
                Some(raw) => visitor.vector_array(raw),
                None => visitor.on_unknown(self.tag(), payload, self.decoder().data()),
            },
            tag => visitor.on_unknown(tag, payload, self.decoder().data()),
        }
        Ok(())
    }
}

/// Vector data of a vector or vector array; `None` for an unknown subtype.
fn raw_vector<'a, S: SizeStrategy>(value: &DynamicAccessor<'a, S>) -> Result<Option<RawVector<'a>>> {
    let dec = value.decoder();
    let pos = value.payload() as usize;
    let prefix = dec.bytes(pos, 2)?;
    let subtype = match Subtype::from_u8(prefix[0]) {
        Ok(subtype) => subtype,
        Err(DatoError::UnknownSubtype(_)) => return Ok(None),
        Err(err) => return Err(err),
    };
    let elem_count = prefix[1];

    let mut start = pos + 2;
    let vector_count = if value.tag() == TAG_VECTOR_ARRAY {
        dec.read_size(SizeCategory::ValueLength, &mut start)? as usize
    } else {
        1
    };
    let size = vector_count
        .checked_mul(elem_count as usize * subtype.size())
        .ok_or_else(|| DatoError::out_of_bounds(start, usize::MAX, dec.len()))?;
    Ok(Some(RawVector {
        subtype,
        elem_count,
        vector_count,
        data: dec.bytes(start, size)?,
    }))
}

impl<'a, S: SizeStrategy> StringMapAccessor<'a, S> {
    /// Walk every entry in storage order.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.begin_map(TypeTag::StringMap, self.len());
        for i in 0..self.len() {
            let key = self.key_at(i)?;
            visitor.begin_string_key(key);
            self.value_at(i)?.visit(visitor)?;
            visitor.end_string_key(key);
        }
        visitor.end_map(TypeTag::StringMap);
        Ok(())
    }
}

impl<'a, S: SizeStrategy> IntMapAccessor<'a, S> {
    /// Walk every entry in storage order.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.begin_map(TypeTag::IntMap, self.len());
        for i in 0..self.len() {
            let key = self.key_at(i)?;
            visitor.begin_int_key(key);
            self.value_at(i)?.visit(visitor)?;
            visitor.end_int_key(key);
        }
        visitor.end_map(TypeTag::IntMap);
        Ok(())
    }
}

impl<'a, S: SizeStrategy> ArrayAccessor<'a, S> {
    /// Walk every element in order.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.begin_array(self.len());
        for i in 0..self.len() {
            visitor.begin_array_index(i);
            self.get(i)?.visit(visitor)?;
            visitor.end_array_index(i);
        }
        visitor.end_array();
        Ok(())
    }
}

impl<'a> TypedArrayAccessor<'a, u8> {
    /// Hand these bytes to `visitor` as an 8-bit string.
    ///
    /// String8 and byte array accessors share this type, so the caller picks
    /// the callback.
    pub fn visit_string8<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.string8(self.as_bytes()?);
        Ok(())
    }

    /// Hand these bytes to `visitor` as a byte array.
    pub fn visit_byte_array<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.byte_array(self.as_bytes()?);
        Ok(())
    }
}

impl<'a> String16Accessor<'a> {
    /// Hand this string to `visitor`.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.string16(*self);
        Ok(())
    }
}

impl<'a> String32Accessor<'a> {
    /// Hand this string to `visitor`.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.string32(*self);
        Ok(())
    }
}

impl<'a, T: Primitive> VectorAccessor<'a, T> {
    /// Hand this vector to `visitor`.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.vector(self.raw()?);
        Ok(())
    }
}

impl<'a, T: Primitive> VectorArrayAccessor<'a, T> {
    /// Hand this vector array to `visitor`.
    pub fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        visitor.vector_array(self.raw()?);
        Ok(())
    }
}

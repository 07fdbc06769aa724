//! Typed array, string and vector accessors
//!
//! These hold a slice of the whole buffer plus a start offset. Element reads
//! copy out of the bytes, so nothing here depends on the buffer's alignment.

use crate::decoder::Decoder;
use dato_format::primitive::read_at;
use dato_format::{DatoError, Primitive, Result, SizeCategory, SizeStrategy, Subtype};
use std::borrow::Cow;
use std::marker::PhantomData;

fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(DatoError::IndexOutOfRange { index, len })
    }
}

fn slice(data: &[u8], start: usize, size: usize) -> Result<&[u8]> {
    start
        .checked_add(size)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| DatoError::out_of_bounds(start, size, data.len()))
}

/// Up to `count` elements starting at `start`, stopping at the end of `data`.
fn elements<T: Primitive>(data: &[u8], start: usize, count: usize) -> impl Iterator<Item = T> + '_ {
    data.get(start..)
        .unwrap_or_default()
        .chunks_exact(T::SIZE)
        .take(count)
        .map(T::from_le_slice)
}

fn copy_elements<T: Primitive>(data: &[u8], start: usize, out: &mut [T]) -> Result<()> {
    let bytes = slice(data, start, out.len() * T::SIZE)?;
    for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(T::SIZE)) {
        *slot = T::from_le_slice(chunk);
    }
    Ok(())
}

/// Length-prefixed run of `T`: strings of every width and byte arrays
#[derive(Debug, Clone, Copy)]
pub struct TypedArrayAccessor<'a, T: Primitive> {
    data: &'a [u8],
    start: usize,
    len: usize,
    _marker: PhantomData<T>,
}

/// UTF-8 string
pub type String8Accessor<'a> = TypedArrayAccessor<'a, u8>;
/// UTF-16 string
pub type String16Accessor<'a> = TypedArrayAccessor<'a, u16>;
/// UTF-32 string
pub type String32Accessor<'a> = TypedArrayAccessor<'a, u32>;
/// Raw bytes
pub type ByteArrayAccessor<'a> = TypedArrayAccessor<'a, u8>;

impl<'a, T: Primitive> TypedArrayAccessor<'a, T> {
    pub(crate) fn new<S: SizeStrategy>(dec: &Decoder<'a, S>, pos: u32) -> Result<Self> {
        let mut start = pos as usize;
        let len = dec.read_size(SizeCategory::ValueLength, &mut start)? as usize;
        dec.expect_extent(start, len, T::SIZE)?;
        Ok(Self {
            data: dec.data(),
            start,
            len,
            _marker: PhantomData,
        })
    }

    /// Number of elements, terminator excluded
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element `index`
    pub fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.len)?;
        read_at(self.data, self.start + index * T::SIZE)
    }

    /// Elements in order
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        elements(self.data, self.start, self.len)
    }

    /// Copy the first `out.len()` elements.
    pub fn copy_to(&self, out: &mut [T]) -> Result<()> {
        if out.len() > self.len {
            return Err(DatoError::IndexOutOfRange {
                index: out.len(),
                len: self.len,
            });
        }
        copy_elements(self.data, self.start, out)
    }

    /// All elements
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.len];
        copy_elements(self.data, self.start, &mut out)?;
        Ok(out)
    }

    /// Raw little-endian bytes of the elements
    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        slice(self.data, self.start, self.len * T::SIZE)
    }
}

impl<'a> TypedArrayAccessor<'a, u8> {
    /// Contents as UTF-8
    pub fn as_str(&self) -> Result<&'a str> {
        std::str::from_utf8(self.as_bytes()?).map_err(|_| DatoError::InvalidUtf8)
    }

    /// Contents as UTF-8, replacing invalid sequences
    pub fn to_string_lossy(&self) -> Result<Cow<'a, str>> {
        Ok(String::from_utf8_lossy(self.as_bytes()?))
    }
}

impl<'a> TypedArrayAccessor<'a, u16> {
    /// Decode UTF-16 units
    pub fn to_string(&self) -> Result<String> {
        char::decode_utf16(self.iter())
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| DatoError::InvalidUtf8)
    }

    /// Decode UTF-16 units, replacing unpaired surrogates
    pub fn to_string_lossy(&self) -> String {
        char::decode_utf16(self.iter())
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

impl<'a> TypedArrayAccessor<'a, u32> {
    /// Decode UTF-32 units
    pub fn to_string(&self) -> Result<String> {
        self.iter()
            .map(|unit| char::from_u32(unit).ok_or(DatoError::InvalidUtf8))
            .collect()
    }

    /// Decode UTF-32 units, replacing invalid code points
    pub fn to_string_lossy(&self) -> String {
        self.iter()
            .map(|unit| char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

/// One vector of `T`
#[derive(Debug, Clone, Copy)]
pub struct VectorAccessor<'a, T: Primitive> {
    data: &'a [u8],
    start: usize,
    len: u8,
    _marker: PhantomData<T>,
}

impl<'a, T: Primitive> VectorAccessor<'a, T> {
    /// `start` is the first data byte, after subtype and count.
    pub(crate) fn new<S: SizeStrategy>(dec: &Decoder<'a, S>, start: usize, len: u8) -> Result<Self> {
        dec.expect_extent(start, len as usize, T::SIZE)?;
        Ok(Self {
            data: dec.data(),
            start,
            len,
            _marker: PhantomData,
        })
    }

    /// Element type
    pub fn subtype(&self) -> Subtype {
        T::SUBTYPE
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false for vectors written by the encoder
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Element `index`
    pub fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.len())?;
        read_at(self.data, self.start + index * T::SIZE)
    }

    /// Elements in order
    pub fn iter(&self) -> impl Iterator<Item = T> + 'a {
        elements(self.data, self.start, self.len())
    }

    /// Copy the first `out.len()` elements.
    pub fn copy_to(&self, out: &mut [T]) -> Result<()> {
        if out.len() > self.len() {
            return Err(DatoError::IndexOutOfRange {
                index: out.len(),
                len: self.len(),
            });
        }
        copy_elements(self.data, self.start, out)
    }

    /// All elements
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut out = vec![T::default(); self.len()];
        copy_elements(self.data, self.start, &mut out)?;
        Ok(out)
    }

    /// Untyped view of the same elements
    pub fn raw(&self) -> Result<RawVector<'a>> {
        Ok(RawVector {
            subtype: T::SUBTYPE,
            elem_count: self.len,
            vector_count: 1,
            data: slice(self.data, self.start, self.len() * T::SIZE)?,
        })
    }
}

/// Run of equally sized vectors of `T`, stored flat
#[derive(Debug, Clone, Copy)]
pub struct VectorArrayAccessor<'a, T: Primitive> {
    data: &'a [u8],
    start: usize,
    elem_count: u8,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'a, T: Primitive> VectorArrayAccessor<'a, T> {
    /// `pos` is the position of the vector count, after subtype and
    /// element count.
    pub(crate) fn new<S: SizeStrategy>(
        dec: &Decoder<'a, S>,
        pos: usize,
        elem_count: u8,
    ) -> Result<Self> {
        let mut start = pos;
        let len = dec.read_size(SizeCategory::ValueLength, &mut start)? as usize;
        let flat = len
            .checked_mul(elem_count as usize)
            .ok_or_else(|| DatoError::out_of_bounds(start, usize::MAX, dec.len()))?;
        dec.expect_extent(start, flat, T::SIZE)?;
        Ok(Self {
            data: dec.data(),
            start,
            elem_count,
            len,
            _marker: PhantomData,
        })
    }

    /// Element type
    pub fn subtype(&self) -> Subtype {
        T::SUBTYPE
    }

    /// Elements per vector
    pub fn element_count(&self) -> usize {
        self.elem_count as usize
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no vectors
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Vector `index`
    pub fn vector(&self, index: usize) -> Result<VectorAccessor<'a, T>> {
        check_index(index, self.len)?;
        Ok(VectorAccessor {
            data: self.data,
            start: self.start + index * self.element_count() * T::SIZE,
            len: self.elem_count,
            _marker: PhantomData,
        })
    }

    /// Element at flat index `index`
    pub fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.len * self.element_count())?;
        read_at(self.data, self.start + index * T::SIZE)
    }

    /// Copy `out.len()` elements starting at the first element of vector
    /// `first_vector`.
    pub fn copy_to(&self, out: &mut [T], first_vector: usize) -> Result<()> {
        let total = self.len * self.element_count();
        let out_of_range = || DatoError::IndexOutOfRange {
            index: first_vector,
            len: self.len,
        };
        let first = first_vector
            .checked_mul(self.element_count())
            .ok_or_else(out_of_range)?;
        match first.checked_add(out.len()) {
            Some(end) if end <= total => {}
            _ => return Err(out_of_range()),
        }
        copy_elements(self.data, self.start + first * T::SIZE, out)
    }

    /// Vectors in order
    pub fn rows(&self) -> impl Iterator<Item = VectorAccessor<'a, T>> + 'a {
        let array = *self;
        (0..self.len).filter_map(move |i| array.vector(i).ok())
    }

    /// Untyped view of all vectors
    pub fn raw(&self) -> Result<RawVector<'a>> {
        Ok(RawVector {
            subtype: T::SUBTYPE,
            elem_count: self.elem_count,
            vector_count: self.len,
            data: slice(self.data, self.start, self.len * self.element_count() * T::SIZE)?,
        })
    }
}

/// Vector data handed to a visitor without fixing the element type
#[derive(Debug, Clone, Copy)]
pub struct RawVector<'a> {
    /// Element type
    pub subtype: Subtype,
    /// Elements per vector
    pub elem_count: u8,
    /// Number of vectors (1 for a single vector)
    pub vector_count: usize,
    /// Little-endian element bytes
    pub data: &'a [u8],
}

impl<'a> RawVector<'a> {
    /// Total number of elements
    pub fn element_total(&self) -> usize {
        self.vector_count * self.elem_count as usize
    }

    /// Elements of one vector as `f64`
    pub fn row_f64(&self, row: usize) -> Result<Vec<f64>> {
        check_index(row, self.vector_count)?;
        let first = row * self.elem_count as usize;
        (first..first + self.elem_count as usize)
            .map(|i| self.get_f64(i))
            .collect()
    }

    /// Element at flat index `index`, converted to `f64`
    pub fn get_f64(&self, index: usize) -> Result<f64> {
        check_index(index, self.element_total())?;
        let pos = index * self.subtype.size();
        let data = self.data;
        Ok(match self.subtype {
            Subtype::I8 => read_at::<i8>(data, pos)? as f64,
            Subtype::U8 => read_at::<u8>(data, pos)? as f64,
            Subtype::I16 => read_at::<i16>(data, pos)? as f64,
            Subtype::U16 => read_at::<u16>(data, pos)? as f64,
            Subtype::I32 => read_at::<i32>(data, pos)? as f64,
            Subtype::U32 => read_at::<u32>(data, pos)? as f64,
            Subtype::I64 => read_at::<i64>(data, pos)? as f64,
            Subtype::U64 => read_at::<u64>(data, pos)? as f64,
            Subtype::F32 => read_at::<f32>(data, pos)? as f64,
            Subtype::F64 => read_at::<f64>(data, pos)?,
        })
    }

    /// Element at flat index `index` as a JSON number, keeping integers exact
    pub fn get_json(&self, index: usize) -> Result<serde_json::Value> {
        check_index(index, self.element_total())?;
        let pos = index * self.subtype.size();
        let data = self.data;
        Ok(match self.subtype {
            Subtype::I8 => read_at::<i8>(data, pos)?.into(),
            Subtype::U8 => read_at::<u8>(data, pos)?.into(),
            Subtype::I16 => read_at::<i16>(data, pos)?.into(),
            Subtype::U16 => read_at::<u16>(data, pos)?.into(),
            Subtype::I32 => read_at::<i32>(data, pos)?.into(),
            Subtype::U32 => read_at::<u32>(data, pos)?.into(),
            Subtype::I64 => read_at::<i64>(data, pos)?.into(),
            Subtype::U64 => read_at::<u64>(data, pos)?.into(),
            Subtype::F32 => json_float(read_at::<f32>(data, pos)? as f64),
            Subtype::F64 => json_float(read_at::<f64>(data, pos)?),
        })
    }
}

/// Finite floats become numbers, anything else null.
pub(crate) fn json_float(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

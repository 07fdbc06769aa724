//! Accessor for a value of any type

use crate::container::{ArrayAccessor, IntMapAccessor, StringMapAccessor};
use crate::decoder::Decoder;
use crate::typed::{
    ByteArrayAccessor, String16Accessor, String32Accessor, String8Accessor, TypedArrayAccessor,
    VectorAccessor, VectorArrayAccessor,
};
use dato_format::constants::*;
use dato_format::{AdaptiveConfig, DatoError, Primitive, Result, SizeStrategy, Subtype, TypeTag};

/// Numeric types reachable through [`DynamicAccessor::cast`]
///
/// Conversions follow `as` semantics: truncation toward zero, saturation at
/// the target's range, NaN to zero for integers.
pub trait CastNumber: Copy {
    /// Convert a signed integer
    fn from_i64(value: i64) -> Self;
    /// Convert an unsigned integer
    fn from_u64(value: u64) -> Self;
    /// Convert a float
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_cast_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CastNumber for $ty {
                #[inline]
                fn from_i64(value: i64) -> Self {
                    value as $ty
                }

                #[inline]
                fn from_u64(value: u64) -> Self {
                    value as $ty
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_cast_number!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

/// A value of any type: decoder, payload, raw type tag
///
/// For embedded types the payload is the value; otherwise it is the
/// absolute position of the value's storage.
#[derive(Debug, Clone, Copy)]
pub struct DynamicAccessor<'a, S: SizeStrategy = AdaptiveConfig> {
    dec: Decoder<'a, S>,
    payload: u32,
    tag: u8,
}

impl<'a, S: SizeStrategy> DynamicAccessor<'a, S> {
    pub(crate) fn new(dec: Decoder<'a, S>, payload: u32, tag: u8) -> Self {
        Self { dec, payload, tag }
    }

    /// Raw type tag; may be a tag this version does not know.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// Known type tag
    pub fn type_tag(&self) -> Result<TypeTag> {
        TypeTag::from_u8(self.tag)
    }

    /// Embedded value bits or absolute position
    pub fn payload(&self) -> u32 {
        self.payload
    }

    /// Decoder this value belongs to
    pub fn decoder(&self) -> Decoder<'a, S> {
        self.dec
    }

    // Type checks

    /// Null value
    pub fn is_null(&self) -> bool {
        self.tag == TAG_NULL
    }

    /// Boolean value
    pub fn is_bool(&self) -> bool {
        self.tag == TAG_BOOL
    }

    /// Integer of any width or signedness
    pub fn is_integer(&self) -> bool {
        matches!(self.tag, TAG_INT32 | TAG_UINT32 | TAG_INT64 | TAG_UINT64)
    }

    /// 32- or 64-bit float
    pub fn is_float(&self) -> bool {
        matches!(self.tag, TAG_FLOAT32 | TAG_FLOAT64)
    }

    /// Integer or float
    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Vector of `T` with exactly `elem_count` elements
    pub fn is_vector<T: Primitive>(&self, elem_count: usize) -> bool {
        self.tag == TAG_VECTOR && self.has_prefix::<T>(elem_count)
    }

    /// Vector array of `T` whose vectors have exactly `elem_count` elements
    pub fn is_vector_array<T: Primitive>(&self, elem_count: usize) -> bool {
        self.tag == TAG_VECTOR_ARRAY && self.has_prefix::<T>(elem_count)
    }

    fn has_prefix<T: Primitive>(&self, elem_count: usize) -> bool {
        matches!(self.vector_prefix(), Ok(prefix) if prefix == (T::SUBTYPE as u8, elem_count))
    }

    /// Raw subtype byte and element count of a vector or vector array
    fn vector_prefix(&self) -> Result<(u8, usize)> {
        let pos = self.payload as usize;
        let prefix = self.dec.bytes(pos, 2)?;
        Ok((prefix[0], prefix[1] as usize))
    }

    fn expect_vector_kind(&self) -> Result<()> {
        if self.tag == TAG_VECTOR || self.tag == TAG_VECTOR_ARRAY {
            Ok(())
        } else {
            Err(DatoError::TypeMismatch {
                expected: TypeTag::Vector,
                found: self.tag,
            })
        }
    }

    /// Element type of a vector or vector array
    pub fn subtype(&self) -> Result<Subtype> {
        self.expect_vector_kind()?;
        Subtype::from_u8(self.vector_prefix()?.0)
    }

    /// Elements per vector of a vector or vector array
    pub fn element_count(&self) -> Result<usize> {
        self.expect_vector_kind()?;
        Ok(self.vector_prefix()?.1)
    }

    // Strict accessors

    fn expect(&self, expected: TypeTag) -> Result<()> {
        if self.dec.validation().input_types && self.tag != expected as u8 {
            return Err(DatoError::TypeMismatch {
                expected,
                found: self.tag,
            });
        }
        Ok(())
    }

    /// Boolean
    pub fn as_bool(&self) -> Result<bool> {
        self.expect(TypeTag::Bool)?;
        Ok(self.payload != 0)
    }

    /// Signed 32-bit integer
    pub fn as_i32(&self) -> Result<i32> {
        self.expect(TypeTag::Int32)?;
        Ok(self.payload as i32)
    }

    /// Unsigned 32-bit integer
    pub fn as_u32(&self) -> Result<u32> {
        self.expect(TypeTag::UInt32)?;
        Ok(self.payload)
    }

    /// 32-bit float
    pub fn as_f32(&self) -> Result<f32> {
        self.expect(TypeTag::Float32)?;
        Ok(f32::from_bits(self.payload))
    }

    /// Signed 64-bit integer
    pub fn as_i64(&self) -> Result<i64> {
        self.expect(TypeTag::Int64)?;
        self.dec.read(self.payload as usize)
    }

    /// Unsigned 64-bit integer
    pub fn as_u64(&self) -> Result<u64> {
        self.expect(TypeTag::UInt64)?;
        self.dec.read(self.payload as usize)
    }

    /// 64-bit float
    pub fn as_f64(&self) -> Result<f64> {
        self.expect(TypeTag::Float64)?;
        self.dec.read(self.payload as usize)
    }

    /// String map
    pub fn as_string_map(&self) -> Result<StringMapAccessor<'a, S>> {
        self.expect(TypeTag::StringMap)?;
        StringMapAccessor::new(self.dec, self.payload)
    }

    /// Int map
    pub fn as_int_map(&self) -> Result<IntMapAccessor<'a, S>> {
        self.expect(TypeTag::IntMap)?;
        IntMapAccessor::new(self.dec, self.payload)
    }

    /// Array
    pub fn as_array(&self) -> Result<ArrayAccessor<'a, S>> {
        self.expect(TypeTag::Array)?;
        ArrayAccessor::new(self.dec, self.payload)
    }

    /// 8-bit string
    pub fn as_string8(&self) -> Result<String8Accessor<'a>> {
        self.expect(TypeTag::String8)?;
        TypedArrayAccessor::new(&self.dec, self.payload)
    }

    /// 8-bit string as UTF-8
    pub fn as_str(&self) -> Result<&'a str> {
        self.as_string8()?.as_str()
    }

    /// 16-bit string
    pub fn as_string16(&self) -> Result<String16Accessor<'a>> {
        self.expect(TypeTag::String16)?;
        TypedArrayAccessor::new(&self.dec, self.payload)
    }

    /// 32-bit string
    pub fn as_string32(&self) -> Result<String32Accessor<'a>> {
        self.expect(TypeTag::String32)?;
        TypedArrayAccessor::new(&self.dec, self.payload)
    }

    /// Byte array
    pub fn as_byte_array(&self) -> Result<ByteArrayAccessor<'a>> {
        self.expect(TypeTag::ByteArray)?;
        TypedArrayAccessor::new(&self.dec, self.payload)
    }

    fn expect_subtype<T: Primitive>(&self, subtype: u8) -> Result<()> {
        if self.dec.validation().input_types && subtype != T::SUBTYPE as u8 {
            return Err(DatoError::SubtypeMismatch {
                expected: T::SUBTYPE,
                found: subtype,
            });
        }
        Ok(())
    }

    /// Vector of `T`
    pub fn as_vector<T: Primitive>(&self) -> Result<VectorAccessor<'a, T>> {
        self.expect(TypeTag::Vector)?;
        let (subtype, count) = self.vector_prefix()?;
        self.expect_subtype::<T>(subtype)?;
        VectorAccessor::new(&self.dec, self.payload as usize + 2, count as u8)
    }

    /// Vector array of `T`
    pub fn as_vector_array<T: Primitive>(&self) -> Result<VectorArrayAccessor<'a, T>> {
        self.expect(TypeTag::VectorArray)?;
        let (subtype, count) = self.vector_prefix()?;
        self.expect_subtype::<T>(subtype)?;
        VectorArrayAccessor::new(&self.dec, self.payload as usize + 2, count as u8)
    }

    // Checked accessors: `Ok(None)` on a type mismatch

    /// Boolean, if this is one
    pub fn try_bool(&self) -> Option<bool> {
        self.is_bool().then_some(self.payload != 0)
    }

    /// Signed 32-bit integer, if this is one
    pub fn try_i32(&self) -> Option<i32> {
        (self.tag == TAG_INT32).then_some(self.payload as i32)
    }

    /// Unsigned 32-bit integer, if this is one
    pub fn try_u32(&self) -> Option<u32> {
        (self.tag == TAG_UINT32).then_some(self.payload)
    }

    /// 32-bit float, if this is one
    pub fn try_f32(&self) -> Option<f32> {
        (self.tag == TAG_FLOAT32).then(|| f32::from_bits(self.payload))
    }

    /// Signed 64-bit integer, if this is one
    pub fn try_i64(&self) -> Result<Option<i64>> {
        self.try_read(TAG_INT64)
    }

    /// Unsigned 64-bit integer, if this is one
    pub fn try_u64(&self) -> Result<Option<u64>> {
        self.try_read(TAG_UINT64)
    }

    /// 64-bit float, if this is one
    pub fn try_f64(&self) -> Result<Option<f64>> {
        self.try_read(TAG_FLOAT64)
    }

    fn try_read<T: Primitive>(&self, tag: u8) -> Result<Option<T>> {
        if self.tag != tag {
            return Ok(None);
        }
        self.dec.read(self.payload as usize).map(Some)
    }

    /// String map, if this is one
    pub fn try_string_map(&self) -> Result<Option<StringMapAccessor<'a, S>>> {
        if self.tag != TAG_STRING_MAP {
            return Ok(None);
        }
        StringMapAccessor::new(self.dec, self.payload).map(Some)
    }

    /// Int map, if this is one
    pub fn try_int_map(&self) -> Result<Option<IntMapAccessor<'a, S>>> {
        if self.tag != TAG_INT_MAP {
            return Ok(None);
        }
        IntMapAccessor::new(self.dec, self.payload).map(Some)
    }

    /// Array, if this is one
    pub fn try_array(&self) -> Result<Option<ArrayAccessor<'a, S>>> {
        if self.tag != TAG_ARRAY {
            return Ok(None);
        }
        ArrayAccessor::new(self.dec, self.payload).map(Some)
    }

    fn try_typed<T: Primitive>(&self, tag: u8) -> Result<Option<TypedArrayAccessor<'a, T>>> {
        if self.tag != tag {
            return Ok(None);
        }
        TypedArrayAccessor::new(&self.dec, self.payload).map(Some)
    }

    /// 8-bit string, if this is one
    pub fn try_string8(&self) -> Result<Option<String8Accessor<'a>>> {
        self.try_typed(TAG_STRING8)
    }

    /// 16-bit string, if this is one
    pub fn try_string16(&self) -> Result<Option<String16Accessor<'a>>> {
        self.try_typed(TAG_STRING16)
    }

    /// 32-bit string, if this is one
    pub fn try_string32(&self) -> Result<Option<String32Accessor<'a>>> {
        self.try_typed(TAG_STRING32)
    }

    /// Byte array, if this is one
    pub fn try_byte_array(&self) -> Result<Option<ByteArrayAccessor<'a>>> {
        self.try_typed(TAG_BYTE_ARRAY)
    }

    /// Vector of `T`, if this is one
    pub fn try_vector<T: Primitive>(&self) -> Result<Option<VectorAccessor<'a, T>>> {
        if self.tag != TAG_VECTOR {
            return Ok(None);
        }
        let (subtype, count) = self.vector_prefix()?;
        if subtype != T::SUBTYPE as u8 {
            return Ok(None);
        }
        VectorAccessor::new(&self.dec, self.payload as usize + 2, count as u8).map(Some)
    }

    /// Vector array of `T`, if this is one
    pub fn try_vector_array<T: Primitive>(&self) -> Result<Option<VectorArrayAccessor<'a, T>>> {
        if self.tag != TAG_VECTOR_ARRAY {
            return Ok(None);
        }
        let (subtype, count) = self.vector_prefix()?;
        if subtype != T::SUBTYPE as u8 {
            return Ok(None);
        }
        VectorArrayAccessor::new(&self.dec, self.payload as usize + 2, count as u8).map(Some)
    }

    // Casts

    /// Any number or bool converted to `T`; other types give zero.
    pub fn cast<T: CastNumber>(&self) -> Result<T> {
        Ok(match self.tag {
            TAG_BOOL => T::from_u64((self.payload != 0) as u64),
            TAG_INT32 => T::from_i64(self.payload as i32 as i64),
            TAG_UINT32 => T::from_u64(self.payload as u64),
            TAG_FLOAT32 => T::from_f64(f32::from_bits(self.payload) as f64),
            TAG_INT64 => T::from_i64(self.dec.read(self.payload as usize)?),
            TAG_UINT64 => T::from_u64(self.dec.read(self.payload as usize)?),
            TAG_FLOAT64 => T::from_f64(self.dec.read(self.payload as usize)?),
            _ => T::from_u64(0),
        })
    }

    /// Non-zero numbers and `true` give true; other types give false.
    pub fn cast_bool(&self) -> Result<bool> {
        Ok(match self.tag {
            TAG_BOOL | TAG_INT32 | TAG_UINT32 => self.payload != 0,
            TAG_FLOAT32 => f32::from_bits(self.payload) != 0.0,
            TAG_INT64 | TAG_UINT64 => self.dec.read::<u64>(self.payload as usize)? != 0,
            TAG_FLOAT64 => self.dec.read::<f64>(self.payload as usize)? != 0.0,
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Encoder, EncoderOptions, ValueRef};
    use dato_format::Validation;

    /// Array holding one value of each scalar type plus a string.
    fn scalars() -> Vec<u8> {
        let mut enc = Encoder::new(&EncoderOptions::default());
        let mut values: Vec<ValueRef> = vec![
            enc.write_null(),
            enc.write_bool(true),
            enc.write_i32(-7),
            enc.write_u32(7),
            enc.write_f32(2.5),
        ];
        values.push(enc.write_i64(-9_000_000_000).unwrap());
        values.push(enc.write_u64(u64::MAX).unwrap());
        values.push(enc.write_f64(-0.75).unwrap());
        values.push(enc.write_str("text").unwrap());
        values.push(enc.write_vector(&[1.0f32, 2.0, 3.0]).unwrap());
        values.push(enc.write_vector_array(&[1u8, 2, 3, 4], 2).unwrap());
        let root = enc.write_array(&values).unwrap();
        enc.finish(root).unwrap()
    }

    #[test]
    fn test_predicates() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes).unwrap();
        let array = dec.root().as_array().unwrap();
        let v = |i| array.get(i).unwrap();

        assert!(v(0).is_null());
        assert!(v(1).is_bool());
        assert!(v(2).is_integer() && v(3).is_integer() && v(5).is_integer() && v(6).is_integer());
        assert!(v(4).is_float() && v(7).is_float());
        assert!(v(4).is_number() && !v(1).is_number() && !v(8).is_number());
        assert!(v(9).is_vector::<f32>(3));
        assert!(!v(9).is_vector::<f32>(2));
        assert!(!v(9).is_vector::<i32>(3));
        assert!(v(10).is_vector_array::<u8>(2));
        assert!(!v(9).is_vector_array::<f32>(3));
        assert_eq!(v(9).subtype().unwrap(), Subtype::F32);
        assert_eq!(v(10).element_count().unwrap(), 2);
        assert!(v(8).subtype().is_err());
    }

    #[test]
    fn test_strict_accessors() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes).unwrap();
        let array = dec.root().as_array().unwrap();
        let v = |i| array.get(i).unwrap();

        assert!(v(1).as_bool().unwrap());
        assert_eq!(v(2).as_i32().unwrap(), -7);
        assert_eq!(v(3).as_u32().unwrap(), 7);
        assert_eq!(v(4).as_f32().unwrap(), 2.5);
        assert_eq!(v(5).as_i64().unwrap(), -9_000_000_000);
        assert_eq!(v(6).as_u64().unwrap(), u64::MAX);
        assert_eq!(v(7).as_f64().unwrap(), -0.75);
        assert_eq!(v(8).as_str().unwrap(), "text");

        let err = v(2).as_u32().unwrap_err();
        assert!(err.is_type_violation());
        assert!(matches!(
            v(9).as_vector::<i32>(),
            Err(DatoError::SubtypeMismatch { expected: Subtype::I32, found: 8 })
        ));
    }

    #[test]
    fn test_unvalidated_reinterprets() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes)
            .unwrap()
            .with_validation(Validation::trusted());
        let array = dec.root().as_array().unwrap();
        // Int32 bits read as UInt32.
        assert_eq!(array.get(2).unwrap().as_u32().unwrap(), (-7i32) as u32);
    }

    #[test]
    fn test_try_accessors() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes).unwrap();
        let array = dec.root().as_array().unwrap();
        let v = |i| array.get(i).unwrap();

        assert_eq!(v(1).try_bool(), Some(true));
        assert_eq!(v(2).try_bool(), None);
        assert_eq!(v(2).try_i32(), Some(-7));
        assert_eq!(v(3).try_u32(), Some(7));
        assert_eq!(v(4).try_f32(), Some(2.5));
        assert_eq!(v(5).try_i64().unwrap(), Some(-9_000_000_000));
        assert_eq!(v(5).try_u64().unwrap(), None);
        assert_eq!(v(7).try_f64().unwrap(), Some(-0.75));
        assert!(v(8).try_string8().unwrap().is_some());
        assert!(v(8).try_string16().unwrap().is_none());
        assert!(v(8).try_array().unwrap().is_none());
        assert!(v(9).try_vector::<f32>().unwrap().is_some());
        assert!(v(9).try_vector::<f64>().unwrap().is_none());
        assert!(v(10).try_vector_array::<u8>().unwrap().is_some());
        assert!(dec.root().try_array().unwrap().is_some());
        assert!(dec.root().try_string_map().unwrap().is_none());
        assert!(dec.root().try_int_map().unwrap().is_none());
    }

    #[test]
    fn test_cast_number() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes).unwrap();
        let array = dec.root().as_array().unwrap();
        let v = |i| array.get(i).unwrap();

        assert_eq!(v(0).cast::<i32>().unwrap(), 0);
        assert_eq!(v(1).cast::<f64>().unwrap(), 1.0);
        assert_eq!(v(2).cast::<f64>().unwrap(), -7.0);
        assert_eq!(v(2).cast::<u8>().unwrap(), (-7i64) as u8);
        assert_eq!(v(4).cast::<i32>().unwrap(), 2);
        assert_eq!(v(5).cast::<i64>().unwrap(), -9_000_000_000);
        assert_eq!(v(6).cast::<f32>().unwrap(), u64::MAX as f32);
        assert_eq!(v(7).cast::<i16>().unwrap(), 0);
        assert_eq!(v(8).cast::<u32>().unwrap(), 0);
    }

    #[test]
    fn test_cast_bool() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes).unwrap();
        let array = dec.root().as_array().unwrap();
        let v = |i| array.get(i).unwrap();

        assert!(!v(0).cast_bool().unwrap());
        assert!(v(1).cast_bool().unwrap());
        assert!(v(2).cast_bool().unwrap());
        assert!(v(5).cast_bool().unwrap());
        assert!(v(7).cast_bool().unwrap());
        assert!(!v(8).cast_bool().unwrap());
    }

    #[test]
    fn test_unknown_tag() {
        let bytes = scalars();
        let dec = Decoder::open(&bytes).unwrap();
        let unknown = DynamicAccessor::new(dec, 0, 42);
        assert!(unknown.type_tag().is_err());
        assert!(!unknown.is_number());
        assert_eq!(unknown.cast::<i32>().unwrap(), 0);
        assert!(unknown.as_array().unwrap_err().is_type_violation());
    }
}

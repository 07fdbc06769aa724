//! Constants and magic numbers for DATO format

/// Default header prefix: "DATO"
pub const DEFAULT_PREFIX: &[u8] = b"DATO"; // 44 41 54 4F

/// Flag: size fields and payloads are padded to their natural alignment.
pub const FLAG_ALIGNED: u8 = 1 << 0;
/// Flag: map entries are stored in ascending key order.
pub const FLAG_SORTED_KEYS: u8 = 1 << 1;

/// Config id of the all-fixed size strategy.
pub const CONFIG_FIXED_SIZES: u8 = 0;
/// Config id of the strategy with short value lengths.
pub const CONFIG_COMPACT_VALUES: u8 = 1;
/// Config id of the strategy with short map, array and value sizes.
pub const CONFIG_COMPACT: u8 = 2;

/// Type tag representing a `null` value.
pub const TAG_NULL: u8 = 0;
/// Type tag representing an embedded boolean.
pub const TAG_BOOL: u8 = 1;
/// Type tag representing an embedded signed 32-bit integer.
pub const TAG_INT32: u8 = 2;
/// Type tag representing an embedded unsigned 32-bit integer.
pub const TAG_UINT32: u8 = 3;
/// Type tag representing an embedded 32-bit float.
pub const TAG_FLOAT32: u8 = 4;
/// Type tag representing a referenced signed 64-bit integer.
pub const TAG_INT64: u8 = 5;
/// Type tag representing a referenced unsigned 64-bit integer.
pub const TAG_UINT64: u8 = 6;
/// Type tag representing a referenced 64-bit float.
pub const TAG_FLOAT64: u8 = 7;
/// Type tag representing an array of values.
pub const TAG_ARRAY: u8 = 8;
/// Type tag representing a map keyed by strings.
pub const TAG_STRING_MAP: u8 = 9;
/// Type tag representing a map keyed by `u32`.
pub const TAG_INT_MAP: u8 = 10;
/// Type tag representing an 8-bit (UTF-8) string.
pub const TAG_STRING8: u8 = 11;
/// Type tag representing a 16-bit (UTF-16) string.
pub const TAG_STRING16: u8 = 12;
/// Type tag representing a 32-bit (UTF-32) string.
pub const TAG_STRING32: u8 = 13;
/// Type tag representing raw bytes.
pub const TAG_BYTE_ARRAY: u8 = 14;
/// Type tag representing one fixed-size numeric vector.
pub const TAG_VECTOR: u8 = 15;
/// Type tag representing an array of fixed-size numeric vectors.
pub const TAG_VECTOR_ARRAY: u8 = 16;

/// Tags at or above this value store a buffer offset instead of the value.
pub const FIRST_REFERENCE_TAG: u8 = TAG_INT64;

/// Marker byte announcing a 4-byte size in the short32 encoding.
pub const SHORT32_MARKER: u8 = 0xFF;

/// Bytes per string map / int map entry: key slot, value slot, type tag.
pub const MAP_ENTRY_BYTES: usize = 9;
/// Bytes per array entry: value slot, type tag.
pub const ARRAY_ENTRY_BYTES: usize = 5;

/// Maximum elements in one vector.
pub const MAX_VECTOR_ELEMENTS: usize = 255;

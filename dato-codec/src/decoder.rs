//! Zero-copy decoder
//!
//! A [`Decoder`] is a `Copy` view over a finished buffer. Opening parses only
//! the header; every accessor reads its part of the buffer on demand.

use crate::dynamic::DynamicAccessor;
use dato_format::constants::DEFAULT_PREFIX;
use dato_format::primitive::{check_extent, read_at};
use dato_format::{
    AdaptiveConfig, DatoError, Header, Primitive, Result, SizeCategory, SizeStrategy, Validation,
};
use tracing::debug;

/// Read-only view over an encoded buffer
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a, S: SizeStrategy = AdaptiveConfig> {
    data: &'a [u8],
    strategy: S,
    header: Header,
    validation: Validation,
}

impl<'a> Decoder<'a, AdaptiveConfig> {
    /// Open a buffer with the default `DATO` prefix, resolving the size
    /// strategy from its header.
    pub fn open(data: &'a [u8]) -> Result<Self> {
        Self::open_with_prefix(data, DEFAULT_PREFIX)
    }

    /// Open a buffer written with a custom prefix.
    pub fn open_with_prefix(data: &'a [u8], prefix: &[u8]) -> Result<Self> {
        Self::open_as(data, prefix)
    }
}

impl<'a, S: SizeStrategy> Decoder<'a, S> {
    /// Open a buffer with strategy `S`, which must accept the header's
    /// config id.
    pub fn open_as(data: &'a [u8], prefix: &[u8]) -> Result<Self> {
        let header = Header::decode(data, prefix)?;
        let strategy =
            S::from_id(header.config_id).ok_or(DatoError::UnsupportedConfig(header.config_id))?;
        debug!(
            bytes = data.len(),
            config = header.config_id,
            flags = header.flags,
            root_type = header.root_type,
            "opened buffer"
        );
        Ok(Self {
            data,
            strategy,
            header,
            validation: Validation::default(),
        })
    }

    /// Replace the validation toggles.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Active validation toggles
    pub fn validation(&self) -> Validation {
        self.validation
    }

    /// Decoded header
    pub fn header(&self) -> Header {
        self.header
    }

    /// Resolved size strategy
    pub fn strategy(&self) -> S {
        self.strategy
    }

    /// Whole buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Buffer length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty (never true for an opened buffer)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether map keys are stored in ascending order
    pub fn sorted_keys(&self) -> bool {
        self.header.sorted_keys()
    }

    /// Whether the buffer was written with alignment padding
    pub fn aligned(&self) -> bool {
        self.header.aligned()
    }

    /// Accessor for the root value
    pub fn root(&self) -> DynamicAccessor<'a, S> {
        DynamicAccessor::new(*self, self.header.root_offset, self.header.root_type)
    }

    #[inline]
    pub(crate) fn read<T: Primitive>(&self, pos: usize) -> Result<T> {
        read_at(self.data, pos)
    }

    #[inline]
    pub(crate) fn read_size(&self, category: SizeCategory, pos: &mut usize) -> Result<u32> {
        self.strategy.read_size(category, self.data, pos)
    }

    /// Up-front extent check, skipped when bounds validation is off.
    #[inline]
    pub(crate) fn expect_extent(&self, pos: usize, count: usize, unit: usize) -> Result<()> {
        if !self.validation.buffer_bounds {
            return Ok(());
        }
        let size = count
            .checked_mul(unit)
            .ok_or_else(|| DatoError::out_of_bounds(pos, usize::MAX, self.data.len()))?;
        check_extent(pos, size, self.data.len())
    }

    /// `len` bytes at `pos`, always bounds-checked.
    #[inline]
    pub(crate) fn bytes(&self, pos: usize, len: usize) -> Result<&'a [u8]> {
        pos.checked_add(len)
            .and_then(|end| self.data.get(pos..end))
            .ok_or_else(|| DatoError::out_of_bounds(pos, len, self.data.len()))
    }
}

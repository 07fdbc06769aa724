//! Decoder validation toggles

/// Which fail-fast checks the decoder performs
///
/// Both are on by default. Turning them off is meant for buffers that were
/// produced locally or validated before, where the checks are pure overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    /// Verify up front that containers and typed arrays fit in the buffer.
    /// Individual reads are still bounds-checked when this is off.
    pub buffer_bounds: bool,
    /// Reject strict accessors used on a value of another type. When off,
    /// the payload is reinterpreted as the requested type.
    pub input_types: bool,
}

impl Validation {
    /// All checks disabled
    pub fn trusted() -> Self {
        Self {
            buffer_bounds: false,
            input_types: false,
        }
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self {
            buffer_bounds: true,
            input_types: true,
        }
    }
}

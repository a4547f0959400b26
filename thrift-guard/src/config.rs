//! This module contains the configuration structure for the guarded decoder.

// CONSTANTS
// ================================================================================================

/// The default size limit, in bytes, checked against corruption.
///
/// No single record or container is expected to reach this limit; records that do cause the
/// limit to grow (see [`crate::GuardedDecoder`]).
pub const DEFAULT_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// The default maximum nesting depth of structs and containers.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The smallest nesting depth the decoder can be configured with; a record is itself a struct.
pub const MIN_MAX_DEPTH: usize = 1;

/// A grown size limit exceeds the record length by `1 / LIMIT_GROWTH_DIVISOR` of that length.
pub const LIMIT_GROWTH_DIVISOR: usize = 10;

// CONFIG
// ================================================================================================

/// The configuration for the decoder's guards.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(from = "DecoderConfigFields"))]
pub struct DecoderConfig {
    /// The size limit the decoder starts with, before any growth.
    initial_size_limit: usize,
    /// The maximum nesting depth of structs and containers.
    max_depth: usize,
}

/// This block contains the accessors for the configuration options.
impl DecoderConfig {
    /// The size limit, in bytes, that a freshly constructed decoder applies to both the total
    /// bytes consumed per record and the declared size of any single container.
    ///
    /// Defaults to [`DEFAULT_SIZE_LIMIT`].
    pub fn initial_size_limit(&self) -> usize {
        self.initial_size_limit
    }

    /// The maximum nesting depth of structs and containers, counting the record itself.
    ///
    /// Defaults to [`DEFAULT_MAX_DEPTH`].
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

// BUILDERS
// ================================================================================================

/// This impl block contains the builder functions for the configuration options.
impl DecoderConfig {
    /// Sets the size limit a freshly constructed decoder starts with.
    ///
    /// A limit of zero is valid: the first non-empty record grows it.
    ///
    /// This defaults to [`DEFAULT_SIZE_LIMIT`].
    pub fn with_initial_size_limit(mut self, initial_size_limit: usize) -> Self {
        self.initial_size_limit = initial_size_limit;
        self
    }

    /// Sets the maximum nesting depth, clamping to [`MIN_MAX_DEPTH`] on the low end.
    ///
    /// This defaults to [`DEFAULT_MAX_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(MIN_MAX_DEPTH);
        self
    }
}

// TRAIT IMPLS
// ================================================================================================

/// Please see individual methods on [`DecoderConfig`] for the default value of each option.
impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            initial_size_limit: DEFAULT_SIZE_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The serialized form of [`DecoderConfig`]; deserialization goes through the builders so the
/// depth clamp applies.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DecoderConfigFields {
    initial_size_limit: usize,
    max_depth: usize,
}

#[cfg(feature = "serde")]
impl From<DecoderConfigFields> for DecoderConfig {
    fn from(fields: DecoderConfigFields) -> Self {
        Self::default()
            .with_initial_size_limit(fields.initial_size_limit)
            .with_max_depth(fields.max_depth)
    }
}

// HELPERS
// ================================================================================================

/// Returns the size limit to adopt after a record of `len` bytes exceeded the current limit.
///
/// The margin is truncated toward zero, and the result saturates at `usize::MAX`.
pub(crate) fn grown_limit(len: usize) -> usize {
    len.saturating_add(len / LIMIT_GROWTH_DIVISOR)
}

// TESTS
// ================================================================================================

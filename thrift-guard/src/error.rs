use alloc::string::String;
use core::fmt;

use thiserror::Error;

use crate::protocol::WireType;

// DECODE ERROR
// ================================================================================================

/// Errors that can occur while decoding a record from a byte window.
///
/// A record that failed to decode must be discarded by the caller: fields read before the error
/// was detected remain populated, so the record is not a consistent value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The requested window does not fit in the supplied buffer.
    #[error("window of {len} bytes at offset {offset} exceeds buffer of {buffer_len} bytes")]
    InvalidRange {
        /// Start of the requested window.
        offset: usize,
        /// Length of the requested window.
        len: usize,
        /// Length of the buffer the window was requested from.
        buffer_len: usize,
    },

    /// A declared size or the total number of bytes read exceeded the decoder's size limit.
    #[error("{guard} guard exceeded: requested {requested}, limit is {limit}")]
    GuardExceeded {
        /// The guard which tripped.
        guard: Guard,
        /// The declared size or cumulative byte count which was rejected.
        requested: usize,
        /// The limit in force when the guard tripped.
        limit: usize,
    },

    /// A type tag was not recognized or is not allowed where it was found.
    #[error("malformed type tag {tag:#04x} in {context}")]
    MalformedTag {
        /// The raw tag byte.
        tag: u8,
        /// Where in the record the tag was read.
        context: TagContext,
    },

    /// The record ended before a value could be read in full.
    #[error("unexpected end of record: requested {requested} bytes, {remaining} remaining")]
    Underrun {
        /// Number of bytes the read required.
        requested: usize,
        /// Number of bytes left in the window.
        remaining: usize,
    },

    /// A length or container size prefix was negative.
    #[error("negative size {0} in length prefix")]
    NegativeSize(i32),

    /// Structs and containers were nested deeper than the configured maximum.
    #[error("nesting depth exceeds the maximum of {0}")]
    DepthExceeded(usize),

    /// A string field did not contain valid UTF-8.
    #[error("string field is not valid utf-8")]
    InvalidUtf8,

    /// The record rejected a decoded value (e.g., a required field was missing).
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl DecodeError {
    /// Returns an [DecodeError::InvalidValue] error carrying the specified message.
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Returns true if this error indicates corrupt or truncated input, rather than a caller
    /// mistake such as an out-of-range window.
    pub fn is_corruption(&self) -> bool {
        !matches!(self, Self::InvalidRange { .. })
    }
}

// GUARD
// ================================================================================================

/// The guard which rejected a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Cumulative bytes consumed while decoding one record.
    TotalBytes,
    /// Declared size of a single string, binary blob, list, set or map.
    ContainerSize,
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalBytes => write!(f, "total bytes"),
            Self::ContainerSize => write!(f, "container size"),
        }
    }
}

// TAG CONTEXT
// ================================================================================================

/// Position in a record at which a type tag was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagContext {
    /// The type of a struct field.
    Field,
    /// The element type of a list or set.
    Element,
    /// The key type of a map.
    MapKey,
    /// The value type of a map.
    MapValue,
    /// A type passed to `skip` by the caller.
    Skip,
}

impl fmt::Display for TagContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => write!(f, "field header"),
            Self::Element => write!(f, "container element type"),
            Self::MapKey => write!(f, "map key type"),
            Self::MapValue => write!(f, "map value type"),
            Self::Skip => write!(f, "skipped value"),
        }
    }
}

impl From<(WireType, TagContext)> for DecodeError {
    fn from((wire_type, context): (WireType, TagContext)) -> Self {
        Self::MalformedTag { tag: wire_type as u8, context }
    }
}

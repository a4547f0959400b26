use alloc::{string::String, vec::Vec};

use tracing::debug;

use super::{FieldHeader, InputProtocol, ListHeader, MapHeader, SetHeader, WireType};
use crate::{DecodeError, Guard, LimitedByteSource, TagContext};

// DECODER LIMITS
// ================================================================================================

/// Bounds enforced while decoding a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderLimits {
    /// Maximum number of bytes consumed while decoding one record.
    pub max_total_bytes: usize,
    /// Maximum declared length of a string or binary value, and maximum declared element count
    /// of a list, set or map.
    pub max_container_size: usize,
    /// Maximum nesting depth of structs and containers, counting the record itself.
    pub max_depth: usize,
}

impl DecoderLimits {
    /// Returns limits which apply `size_limit` to both size guards.
    pub fn uniform(size_limit: usize, max_depth: usize) -> Self {
        Self {
            max_total_bytes: size_limit,
            max_container_size: size_limit,
            max_depth,
        }
    }
}

// DECODER STATE
// ================================================================================================

/// The owned, reusable state of a [BinaryInputProtocol].
///
/// The limits are fixed at construction; changing them means building a new state. The per-call
/// counters are cleared by [DecoderState::reset], which must happen before each record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderState {
    limits: DecoderLimits,
    bytes_read: usize,
    depth: usize,
}

impl DecoderState {
    /// Returns a new state enforcing the specified limits.
    pub fn new(limits: DecoderLimits) -> Self {
        Self { limits, bytes_read: 0, depth: 0 }
    }

    /// Clears the per-call counters without touching the limits.
    pub fn reset(&mut self) {
        self.bytes_read = 0;
        self.depth = 0;
    }

    /// Returns the limits this state enforces.
    pub fn limits(&self) -> &DecoderLimits {
        &self.limits
    }

    /// Returns the number of bytes consumed since the last reset.
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Returns the current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

// BINARY INPUT PROTOCOL
// ================================================================================================

/// Decodes the Thrift binary encoding from a [LimitedByteSource].
///
/// All integers are big-endian. Strings and binary values carry an `i32` length prefix; lists
/// and sets an element type byte followed by an `i32` count; maps a key type byte, a value type
/// byte and an `i32` count. Fields are a type byte followed by an `i16` identifier, except the
/// stop marker which is the type byte alone.
///
/// The protocol borrows its [DecoderState] and the input window, so constructing one per record
/// costs nothing.
pub struct BinaryInputProtocol<'s, 'a> {
    state: &'s mut DecoderState,
    source: LimitedByteSource<'a>,
}

impl<'s, 'a> BinaryInputProtocol<'s, 'a> {
    /// Returns a protocol reading from `source` under the limits and counters of `state`.
    ///
    /// The counters are not reset; callers decoding a new record should reset `state` first.
    pub fn new(state: &'s mut DecoderState, source: LimitedByteSource<'a>) -> Self {
        Self { state, source }
    }

    /// Returns the source being read.
    pub fn source(&self) -> &LimitedByteSource<'a> {
        &self.source
    }

    /// Returns the number of bytes consumed since the state was last reset.
    pub fn bytes_read(&self) -> usize {
        self.state.bytes_read
    }

    // PRIMITIVE READS
    // --------------------------------------------------------------------------------------------

    /// Charges `n` bytes against the total-bytes guard and returns them from the window.
    fn consume(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let total = self.charge(n)?;
        let bytes = self.source.read_slice(n)?;
        self.state.bytes_read = total;
        Ok(bytes)
    }

    fn consume_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let total = self.charge(N)?;
        let bytes = self.source.read_array::<N>()?;
        self.state.bytes_read = total;
        Ok(bytes)
    }

    /// Returns the byte count the record would reach after reading `n` more bytes.
    fn charge(&self, n: usize) -> Result<usize, DecodeError> {
        let limit = self.state.limits.max_total_bytes;
        let total = self.state.bytes_read.saturating_add(n);
        if total > limit {
            debug!(requested = total, limit, "total bytes guard tripped");
            return Err(DecodeError::GuardExceeded {
                guard: Guard::TotalBytes,
                requested: total,
                limit,
            });
        }
        Ok(total)
    }

    fn read_tag(&mut self, context: TagContext) -> Result<WireType, DecodeError> {
        let [tag] = self.consume_array::<1>()?;
        WireType::from_tag(tag, context)
    }

    /// Reads a container element type, which must carry a value.
    fn read_element_tag(&mut self, context: TagContext) -> Result<WireType, DecodeError> {
        let wire_type = self.read_tag(context)?;
        if !wire_type.is_value() {
            return Err((wire_type, context).into());
        }
        Ok(wire_type)
    }

    /// Reads an `i32` size prefix and checks it against the container size guard.
    fn read_size(&mut self) -> Result<usize, DecodeError> {
        let size = i32::from_be_bytes(self.consume_array::<4>()?);
        let size = usize::try_from(size).map_err(|_| DecodeError::NegativeSize(size))?;
        let limit = self.state.limits.max_container_size;
        if size > limit {
            debug!(requested = size, limit, "container size guard tripped");
            return Err(DecodeError::GuardExceeded {
                guard: Guard::ContainerSize,
                requested: size,
                limit,
            });
        }
        Ok(size)
    }

    fn read_binary_slice(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_size()?;
        self.consume(len)
    }

    // NESTING
    // --------------------------------------------------------------------------------------------

    fn enter(&mut self) -> Result<(), DecodeError> {
        let max_depth = self.state.limits.max_depth;
        if self.state.depth >= max_depth {
            debug!(max_depth, "nesting depth guard tripped");
            return Err(DecodeError::DepthExceeded(max_depth));
        }
        self.state.depth += 1;
        Ok(())
    }

    /// Closes the innermost struct or container.
    ///
    /// Every `read_*_end` must match an earlier `read_*_begin`; an unmatched end is a bug in the
    /// record implementation and is ignored in release builds.
    fn leave(&mut self) -> Result<(), DecodeError> {
        debug_assert!(self.state.depth > 0, "unmatched end of struct or container");
        self.state.depth = self.state.depth.saturating_sub(1);
        Ok(())
    }
}

impl InputProtocol for BinaryInputProtocol<'_, '_> {
    fn read_struct_begin(&mut self) -> Result<(), DecodeError> {
        self.enter()
    }

    fn read_struct_end(&mut self) -> Result<(), DecodeError> {
        self.leave()
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader, DecodeError> {
        let wire_type = self.read_tag(TagContext::Field)?;
        if wire_type == WireType::Stop {
            return Ok(FieldHeader::stop());
        }
        let id = self.read_i16()?;
        Ok(FieldHeader { wire_type, id })
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, DecodeError> {
        let element_type = self.read_element_tag(TagContext::Element)?;
        let size = self.read_size()?;
        self.enter()?;
        Ok(ListHeader { element_type, size })
    }

    fn read_list_end(&mut self) -> Result<(), DecodeError> {
        self.leave()
    }

    fn read_set_begin(&mut self) -> Result<SetHeader, DecodeError> {
        self.read_list_begin()
    }

    fn read_set_end(&mut self) -> Result<(), DecodeError> {
        self.leave()
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, DecodeError> {
        let key_type = self.read_element_tag(TagContext::MapKey)?;
        let value_type = self.read_element_tag(TagContext::MapValue)?;
        let size = self.read_size()?;
        self.enter()?;
        Ok(MapHeader { key_type, value_type, size })
    }

    fn read_map_end(&mut self) -> Result<(), DecodeError> {
        self.leave()
    }

    fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_i8()? == 1)
    }

    fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.consume_array()?))
    }

    fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.consume_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.consume_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.consume_array()?))
    }

    fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(u64::from_be_bytes(self.consume_array()?)))
    }

    fn read_binary(&mut self) -> Result<Vec<u8>, DecodeError> {
        self.read_binary_slice().map(<[u8]>::to_vec)
    }

    fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_binary_slice()?;
        let value = core::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
        Ok(String::from(value))
    }

    fn skip_binary(&mut self) -> Result<(), DecodeError> {
        self.read_binary_slice().map(drop)
    }

    fn max_alloc(&self, element_size: usize) -> usize {
        if element_size == 0 {
            return usize::MAX;
        }
        let budget = self.state.limits.max_total_bytes.saturating_sub(self.state.bytes_read);
        self.source.remaining().min(budget) / element_size
    }
}

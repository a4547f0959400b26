#![no_std]

//! Guarded deserialization of Thrift binary records.
//!
//! Records read from possibly corrupt or truncated input can carry bogus size fields. Decoding
//! such a record naively may allocate without bound, or spin through garbage looking for a
//! terminator. [GuardedDecoder] bounds both: every length prefix and every byte consumed is
//! checked against a size limit which adapts to the largest record seen so far, and the same
//! decoder state is reused across calls without reallocation.
//!
//! ```
//! use thrift_guard::{DecodeError, GuardedDecoder, InputProtocol, Record, WireType};
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: i64,
//! }
//!
//! impl Record for Counter {
//!     fn read<P: InputProtocol>(&mut self, input: &mut P) -> Result<(), DecodeError> {
//!         input.read_struct_begin()?;
//!         loop {
//!             let field = input.read_field_begin()?;
//!             match (field.id, field.wire_type) {
//!                 (_, WireType::Stop) => break,
//!                 (1, WireType::I64) => self.value = input.read_i64()?,
//!                 (_, wire_type) => input.skip(wire_type)?,
//!             }
//!             input.read_field_end()?;
//!         }
//!         input.read_struct_end()
//!     }
//! }
//!
//! // field 1 (i64) = 42, then the stop marker, preceded and followed by unrelated bytes
//! let block = [0xff, 10, 0, 1, 0, 0, 0, 0, 0, 0, 0, 42, 0, 0xff];
//!
//! let mut decoder = GuardedDecoder::new();
//! let mut counter = Counter::default();
//! decoder.deserialize(&mut counter, &block, 1, 12).unwrap();
//! assert_eq!(counter.value, 42);
//! ```

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod config;
mod decoder;
mod error;
pub mod protocol;
mod record;
mod source;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

// RE-EXPORTS
// ================================================================================================

pub use config::{
    DEFAULT_MAX_DEPTH, DEFAULT_SIZE_LIMIT, DecoderConfig, LIMIT_GROWTH_DIVISOR, MIN_MAX_DEPTH,
};
pub use decoder::GuardedDecoder;
pub use error::{DecodeError, Guard, TagContext};
pub use protocol::{
    BinaryInputProtocol, DecoderLimits, DecoderState, FieldHeader, InputProtocol, ListHeader,
    MapHeader, SetHeader, WireType,
};
pub use record::Record;
pub use source::LimitedByteSource;

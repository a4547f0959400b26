use alloc::boxed::Box;

use crate::{DecodeError, InputProtocol};

// RECORD
// ================================================================================================

/// A schema-described record which populates itself from an [InputProtocol].
///
/// Implementations read the struct framing and each field in turn, skipping fields they do not
/// recognize via [InputProtocol::skip]. On error the record may be partially populated and must
/// be discarded.
pub trait Record {
    /// Reads `self` field by field from `input`.
    ///
    /// # Errors
    /// Propagates any error raised by `input`, and returns [DecodeError::InvalidValue] if a
    /// decoded value violates the record's schema (e.g., a required field is absent).
    fn read<P: InputProtocol>(&mut self, input: &mut P) -> Result<(), DecodeError>;
}

impl<R: Record> Record for Box<R> {
    fn read<P: InputProtocol>(&mut self, input: &mut P) -> Result<(), DecodeError> {
        self.as_mut().read(input)
    }
}

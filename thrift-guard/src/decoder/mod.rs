use tracing::{info, trace};

use crate::{
    BinaryInputProtocol, DecodeError, DecoderConfig, DecoderLimits, DecoderState,
    LimitedByteSource, Record, config::grown_limit,
};

#[cfg(test)]
mod tests;

// GUARDED DECODER
// ================================================================================================

/// A reusable decoder which reads records from byte windows under an adaptive size limit.
///
/// The size limit is applied both to the total number of bytes consumed per record and to the
/// declared size of every string, binary value and container. It starts at
/// [DecoderConfig::initial_size_limit] and only ever grows: when a window longer than the limit
/// is presented, the limit becomes the window length plus a 10% margin and the decoder state is
/// rebuilt. Growth should be rare; a decoder whose limit grows on most calls was configured with
/// too small an initial limit.
///
/// Decoder state is reused across calls, so decoding a stream of records allocates nothing
/// beyond what the records themselves store. A decoder decodes one record at a time; concurrent
/// callers should each own a decoder.
#[derive(Debug, Clone)]
pub struct GuardedDecoder {
    config: DecoderConfig,
    size_limit: usize,
    state: DecoderState,
    growth_count: u64,
}

impl GuardedDecoder {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Returns a decoder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Returns a decoder with the specified configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        let size_limit = config.initial_size_limit();
        let state = DecoderState::new(DecoderLimits::uniform(size_limit, config.max_depth()));
        Self { config, size_limit, state, growth_count: 0 }
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the configuration this decoder was built with.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Returns the size limit currently in force.
    pub fn size_limit(&self) -> usize {
        self.size_limit
    }

    /// Returns the number of times the size limit has grown.
    pub fn growth_count(&self) -> u64 {
        self.growth_count
    }

    // DECODING
    // --------------------------------------------------------------------------------------------

    /// Populates `target` from the record encoded in `len` bytes of `bytes` starting at `offset`.
    ///
    /// Only the window is read; the rest of `bytes` is never touched, so records packed into a
    /// larger block can be decoded in place.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the window does not fit in `bytes` ([DecodeError::InvalidRange]); nothing is read and
    ///   the size limit is left unchanged.
    /// - the record violates a guard, carries a malformed tag, or is truncated. Such errors are
    ///   returned as raised by the protocol and `target` must then be discarded.
    pub fn deserialize<R: Record>(
        &mut self,
        target: &mut R,
        bytes: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<(), DecodeError> {
        let source = LimitedByteSource::new(bytes, offset, len)?;

        self.ensure_limit(len);
        self.state.reset();

        let mut protocol = BinaryInputProtocol::new(&mut self.state, source);
        target.read(&mut protocol)
    }

    /// Populates `target` from the record encoded in the whole of `bytes`.
    ///
    /// # Errors
    /// See [GuardedDecoder::deserialize].
    pub fn deserialize_all<R: Record>(
        &mut self,
        target: &mut R,
        bytes: &[u8],
    ) -> Result<(), DecodeError> {
        self.deserialize(target, bytes, 0, bytes.len())
    }

    /// Decodes a new record from `len` bytes of `bytes` starting at `offset`.
    ///
    /// Unlike [GuardedDecoder::deserialize], a failed call leaves nothing behind for the caller
    /// to discard.
    ///
    /// # Errors
    /// See [GuardedDecoder::deserialize].
    pub fn decode<R: Record + Default>(
        &mut self,
        bytes: &[u8],
        offset: usize,
        len: usize,
    ) -> Result<R, DecodeError> {
        let mut record = R::default();
        self.deserialize(&mut record, bytes, offset, len)?;
        Ok(record)
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    /// Grows the size limit to cover a record of `len` bytes, rebuilding the decoder state.
    fn ensure_limit(&mut self, len: usize) {
        if len <= self.size_limit {
            return;
        }

        let previous_limit = self.size_limit;
        self.size_limit = grown_limit(len);
        self.growth_count += 1;
        info!(
            record_len = len,
            previous_limit,
            size_limit = self.size_limit,
            growth_count = self.growth_count,
            "record exceeds size limit; growing limit"
        );

        self.state =
            DecoderState::new(DecoderLimits::uniform(self.size_limit, self.config.max_depth()));
        trace!(size_limit = self.size_limit, "rebuilt decoder state");
    }
}

impl Default for GuardedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

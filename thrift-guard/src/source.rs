use crate::DecodeError;

// LIMITED BYTE SOURCE
// ================================================================================================

/// A read cursor over a window `[offset, offset + len)` of a borrowed byte buffer.
///
/// The source never copies the buffer and never reads outside the window: a read which would
/// cross the end of the window fails with [DecodeError::Underrun]. Rebinding to another window
/// (of the same or a different buffer) does not allocate, so one large input block can be
/// decoded record by record through a single source.
#[derive(Debug, Clone, Copy, Default)]
pub struct LimitedByteSource<'a> {
    buffer: &'a [u8],
    start: usize,
    pos: usize,
    end: usize,
}

impl<'a> LimitedByteSource<'a> {
    // CONSTRUCTORS
    // --------------------------------------------------------------------------------------------

    /// Returns a source bound to an empty window; every read from it underruns.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns a source bound to `len` bytes of `buffer` starting at `offset`.
    ///
    /// # Errors
    /// Returns [DecodeError::InvalidRange] if the window does not fit in `buffer`.
    pub fn new(buffer: &'a [u8], offset: usize, len: usize) -> Result<Self, DecodeError> {
        let mut source = Self::empty();
        source.rebind(buffer, offset, len)?;
        Ok(source)
    }

    // STATE MUTATORS
    // --------------------------------------------------------------------------------------------

    /// Binds this source to `len` bytes of `buffer` starting at `offset`, and moves the cursor to
    /// the start of that window.
    ///
    /// # Errors
    /// Returns [DecodeError::InvalidRange] if `offset + len` overflows or exceeds the length of
    /// `buffer`. On error the source keeps its previous binding.
    pub fn rebind(
        &mut self,
        buffer: &'a [u8],
        offset: usize,
        len: usize,
    ) -> Result<(), DecodeError> {
        check_window(buffer, offset, len)?;
        self.buffer = buffer;
        self.start = offset;
        self.pos = offset;
        self.end = offset + len;
        Ok(())
    }

    /// Returns a single byte and advances the cursor.
    ///
    /// # Errors
    /// Returns [DecodeError::Underrun] if the window is exhausted.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.check_eor(1)?;
        let result = self.buffer[self.pos];
        self.pos += 1;
        Ok(result)
    }

    /// Returns the next `len` bytes of the window without copying them, and advances the cursor.
    ///
    /// # Errors
    /// Returns [DecodeError::Underrun] if fewer than `len` bytes remain in the window.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.check_eor(len)?;
        let buffer: &'a [u8] = self.buffer;
        let result = &buffer[self.pos..self.pos + len];
        self.pos += len;
        Ok(result)
    }

    /// Returns a byte array of length `N` read from the window.
    ///
    /// # Errors
    /// Returns [DecodeError::Underrun] if fewer than `N` bytes remain in the window.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        self.check_eor(N)?;
        let mut result = [0_u8; N];
        result.copy_from_slice(&self.buffer[self.pos..self.pos + N]);
        self.pos += N;
        Ok(result)
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Checks that at least `num_bytes` remain in the window.
    ///
    /// # Errors
    /// Returns [DecodeError::Underrun] if fewer than `num_bytes` bytes remain.
    pub fn check_eor(&self, num_bytes: usize) -> Result<(), DecodeError> {
        if num_bytes > self.remaining() {
            return Err(DecodeError::Underrun {
                requested: num_bytes,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Returns the cursor position relative to the start of the window.
    pub fn position(&self) -> usize {
        self.pos - self.start
    }

    /// Returns the number of unread bytes in the window.
    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// Returns true if there are unread bytes in the window.
    pub fn has_more_bytes(&self) -> bool {
        self.pos < self.end
    }

    /// Returns the full window this source is bound to, regardless of the cursor position.
    pub fn window(&self) -> &'a [u8] {
        let buffer: &'a [u8] = self.buffer;
        &buffer[self.start..self.end]
    }
}

// HELPER FUNCTIONS
// ================================================================================================

/// Checks that `[offset, offset + len)` lies within `buffer`.
fn check_window(buffer: &[u8], offset: usize, len: usize) -> Result<(), DecodeError> {
    match offset.checked_add(len) {
        Some(end) if end <= buffer.len() => Ok(()),
        _ => Err(DecodeError::InvalidRange { offset, len, buffer_len: buffer.len() }),
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn read_within_window() {
        let data = [9u8, 1, 2, 3, 4, 9];
        let mut source = LimitedByteSource::new(&data, 1, 4).unwrap();

        assert_eq!(source.position(), 0);
        assert_eq!(source.remaining(), 4);
        assert!(source.has_more_bytes());
        assert_eq!(source.window(), &[1, 2, 3, 4]);

        assert_eq!(source.read_u8().unwrap(), 1);
        assert_eq!(source.position(), 1);
        assert_eq!(source.read_slice(2).unwrap(), &[2, 3]);
        assert_eq!(source.read_array::<1>().unwrap(), [4]);

        assert!(!source.has_more_bytes());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn read_past_window_underruns() {
        // the byte after the window exists in the buffer but must not be reachable
        let data = [1u8, 2, 3, 4];
        let mut source = LimitedByteSource::new(&data, 0, 2).unwrap();

        assert_matches!(
            source.read_slice(3),
            Err(DecodeError::Underrun { requested: 3, remaining: 2 })
        );
        assert_eq!(source.read_slice(2).unwrap(), &[1, 2]);
        assert_matches!(
            source.read_u8(),
            Err(DecodeError::Underrun { requested: 1, remaining: 0 })
        );
        assert_matches!(source.read_array::<4>(), Err(DecodeError::Underrun { .. }));
    }

    #[test]
    fn empty_source_underruns() {
        let mut source = LimitedByteSource::empty();
        assert!(!source.has_more_bytes());
        assert_matches!(source.read_u8(), Err(DecodeError::Underrun { .. }));
        assert!(source.read_slice(0).unwrap().is_empty());
    }

    #[test]
    fn rebind_moves_to_new_window() {
        let block = [1u8, 2, 3, 4, 5, 6];
        let mut source = LimitedByteSource::new(&block, 0, 3).unwrap();
        assert_eq!(source.read_slice(3).unwrap(), &[1, 2, 3]);

        source.rebind(&block, 3, 3).unwrap();
        assert_eq!(source.position(), 0);
        assert_eq!(source.read_slice(3).unwrap(), &[4, 5, 6]);

        let other = [7u8];
        source.rebind(&other, 0, 1).unwrap();
        assert_eq!(source.read_u8().unwrap(), 7);
    }

    #[test]
    fn rebind_rejects_out_of_range_window() {
        let data = [0u8; 8];
        let mut source = LimitedByteSource::new(&data, 2, 2).unwrap();

        assert_matches!(
            source.rebind(&data, 4, 5),
            Err(DecodeError::InvalidRange { offset: 4, len: 5, buffer_len: 8 })
        );
        assert_matches!(source.rebind(&data, 9, 0), Err(DecodeError::InvalidRange { .. }));
        assert_matches!(source.rebind(&data, usize::MAX, 2), Err(DecodeError::InvalidRange { .. }));

        // a failed rebind leaves the previous window in place
        assert_eq!(source.window(), &[0, 0]);
        assert_eq!(source.remaining(), 2);

        // a window ending exactly at the end of the buffer is valid
        source.rebind(&data, 8, 0).unwrap();
        assert_eq!(source.remaining(), 0);
    }
}

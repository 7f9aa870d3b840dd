//! Prepare-write assembler
//!
//! Long writes arrive as a series of prepare fragments followed by a final
//! fragment. Fragments are appended in offset order until the final one
//! arrives, then the whole value is handed to the codec.

use crate::error::GattError;
use heapless::Vec;

/// Accumulates write fragments for one characteristic
pub struct WriteAssembler<const N: usize> {
    buffer: Vec<u8, N>,
}

impl<const N: usize> WriteAssembler<N> {
    /// Create a new empty assembler.
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Append a fragment written at `offset`.
    ///
    /// The offset must continue exactly where the previous fragment ended and
    /// the fragment must fit the buffer; otherwise the pending value is
    /// dropped and `InvalidOffset` is returned.
    pub fn push(&mut self, offset: usize, data: &[u8]) -> Result<(), GattError> {
        if offset != self.buffer.len() {
            self.buffer.clear();
            return Err(GattError::InvalidOffset);
        }
        if self.buffer.extend_from_slice(data).is_err() {
            self.buffer.clear();
            return Err(GattError::InvalidOffset);
        }
        Ok(())
    }

    /// The assembled value so far
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Reset the assembler, discarding any pending fragments.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Returns true if no fragment is pending.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the number of bytes assembled so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
}

impl<const N: usize> Default for WriteAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

//! Payload generation for the Data characteristic

use crate::config::producer::MAX_PAYLOAD_LEN;
use heapless::Vec;

/// Largest payload the producer builds
pub const MAX_PAYLOAD: usize = MAX_PAYLOAD_LEN as usize;

/// Cycling byte counter
///
/// Consecutive payloads continue the same sequence, so byte `k` of the
/// stream since the last restart is `k mod 256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternGenerator {
    next: u8,
}

impl PatternGenerator {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Start the sequence again from zero
    pub fn restart(&mut self) {
        self.next = 0;
    }

    /// Build the next payload of `len` bytes, clamped to [`MAX_PAYLOAD`]
    pub fn next_payload(&mut self, len: usize) -> Vec<u8, MAX_PAYLOAD> {
        let mut payload = Vec::new();
        for _ in 0..len.min(MAX_PAYLOAD) {
            let _ = payload.push(self.next);
            self.next = self.next.wrapping_add(1);
        }
        payload
    }
}

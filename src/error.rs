//! Error type shared by the codecs, the dispatcher and the scheduler
//!
//! Every variant is a recoverable per-call failure. The BLE task maps them
//! onto ATT error responses.

use core::fmt;

/// Errors returned by characteristic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattError {
    /// Encode destination is shorter than the encoded value
    BufferTooSmall,
    /// Decode input is shorter than its declared payload
    Truncated,
    /// A decoded count, index or value exceeds its fixed bound
    OutOfRange,
    /// Computed JSON length exceeds the buffer capacity
    EncodeTooLarge,
    /// Malformed or type-mismatched JSON
    ParseError,
    /// Offset lies beyond the addressable value
    InvalidOffset,
    /// Notify-send could not deliver the payload
    NotifyTransientFailure,
    /// Characteristic does not support reads
    ReadNotPermitted,
    /// Characteristic does not support writes (or notifications, for CCC writes)
    WriteNotPermitted,
}

impl fmt::Display for GattError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            GattError::BufferTooSmall => "destination buffer too small",
            GattError::Truncated => "input truncated",
            GattError::OutOfRange => "value out of range",
            GattError::EncodeTooLarge => "encoded value too large",
            GattError::ParseError => "malformed JSON",
            GattError::InvalidOffset => "invalid offset",
            GattError::NotifyTransientFailure => "notification not delivered",
            GattError::ReadNotPermitted => "read not permitted",
            GattError::WriteNotPermitted => "write not permitted",
        };
        f.write_str(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", GattError::InvalidOffset), "invalid offset");
        assert_eq!(format!("{}", GattError::ParseError), "malformed JSON");
    }
}

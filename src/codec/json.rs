//! Bounded JSON codec for serde-described records
//!
//! The record type is the schema: every field must be present with the
//! right token type, unknown fields are ignored. Buffers are owned per call,
//! so the codec can be used from either context without sharing scratch
//! space.

use crate::codec::CharacteristicCodec;
use crate::config::json::{STATE_BUFFER_SIZE, STATUS_BUFFER_SIZE};
use crate::error::GattError;
use crate::model::{EntityModel, State};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// JSON codec with an encoded-size bound of `N` bytes
pub struct JsonCodec<const N: usize>;

impl<const N: usize> JsonCodec<N> {
    pub const fn new() -> Self {
        Self
    }

    /// Encode `value` into `out`
    ///
    /// The full encoding is produced first. If it is longer than `N` or than
    /// `out`, `EncodeTooLarge` is returned and `out` is left untouched.
    pub fn encode<T: Serialize>(&self, value: &T, out: &mut [u8]) -> Result<usize, GattError> {
        let encoded = serde_json::to_vec(value).map_err(|_| GattError::ParseError)?;
        if encoded.len() > N.min(out.len()) {
            log::warn!("[json] encoded length {} exceeds capacity {}", encoded.len(), N.min(out.len()));
            return Err(GattError::EncodeTooLarge);
        }
        out[..encoded.len()].copy_from_slice(&encoded);
        Ok(encoded.len())
    }

    /// Parse a complete value from `input`
    ///
    /// Trailing NUL bytes are ignored so C-string writers are accepted.
    pub fn decode<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, GattError> {
        if input.len() > N {
            return Err(GattError::ParseError);
        }
        let end = input.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        serde_json::from_slice(&input[..end]).map_err(|e| {
            log::warn!("[json] parse failed: {}", e);
            GattError::ParseError
        })
    }
}

impl<const N: usize> Default for JsonCodec<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Codec for the State characteristic
pub struct StateCodec {
    json: JsonCodec<STATE_BUFFER_SIZE>,
}

impl StateCodec {
    pub const fn new() -> Self {
        Self {
            json: JsonCodec::new(),
        }
    }
}

impl Default for StateCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacteristicCodec for StateCodec {
    fn encode(&self, model: &EntityModel, out: &mut [u8]) -> Result<usize, GattError> {
        self.json.encode(&model.state, out)
    }

    fn decode(&self, model: &mut EntityModel, input: &[u8]) -> Result<usize, GattError> {
        // Parsed into a temporary first; the live state is replaced only on success
        let state: State = self.json.decode(input)?;
        log::info!("[gatt] state updated: foo={} bar={}", state.foo, state.bar);
        model.state = state;
        Ok(input.len())
    }
}

/// Read-only codec for the Status characteristic
pub struct StatusCodec {
    json: JsonCodec<STATUS_BUFFER_SIZE>,
}

impl StatusCodec {
    pub const fn new() -> Self {
        Self {
            json: JsonCodec::new(),
        }
    }
}

impl Default for StatusCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacteristicCodec for StatusCodec {
    fn encode(&self, model: &EntityModel, out: &mut [u8]) -> Result<usize, GattError> {
        self.json.encode(&model.stats, out)
    }
}

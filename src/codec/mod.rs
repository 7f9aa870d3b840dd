//! Characteristic value codecs
//!
//! Each characteristic converts between its wire bytes and the entity model
//! through a [`CharacteristicCodec`]. Codecs only see the model for the
//! duration of one call, while the caller holds the model lock.

pub mod calibration;
pub mod config;
pub mod cursor;
pub mod json;
pub mod spec;

pub use calibration::CalibrationCodec;
pub use config::ConfigCodec;
pub use json::{JsonCodec, StateCodec, StatusCodec};
pub use spec::{SpecCodec, SpecUpdate};

use crate::error::GattError;
use crate::model::EntityModel;

/// Conversion between a characteristic value and the entity model
pub trait CharacteristicCodec {
    /// Encode the current value into `out`, returning the length written
    ///
    /// On error nothing has been written to `out`.
    fn encode(&self, model: &EntityModel, out: &mut [u8]) -> Result<usize, GattError>;

    /// Decode `input` into the model, returning the bytes consumed
    ///
    /// On error the model is unchanged.
    fn decode(&self, model: &mut EntityModel, input: &[u8]) -> Result<usize, GattError> {
        let _ = (model, input);
        Err(GattError::WriteNotPermitted)
    }
}

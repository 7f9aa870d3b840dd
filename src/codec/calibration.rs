//! Calibration characteristic: stores the written bytes and reads them back

use crate::codec::CharacteristicCodec;
use crate::error::GattError;
use crate::model::EntityModel;
use heapless::Vec;

pub struct CalibrationCodec;

impl CalibrationCodec {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CalibrationCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacteristicCodec for CalibrationCodec {
    fn encode(&self, model: &EntityModel, out: &mut [u8]) -> Result<usize, GattError> {
        let data = &model.calibration.data;
        if out.len() < data.len() {
            return Err(GattError::BufferTooSmall);
        }
        out[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn decode(&self, model: &mut EntityModel, input: &[u8]) -> Result<usize, GattError> {
        let data = Vec::from_slice(input).map_err(|_| GattError::OutOfRange)?;
        model.calibration.data = data;
        log::debug!("[gatt] calibration blob stored ({} bytes)", input.len());
        Ok(input.len())
    }
}

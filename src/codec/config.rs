//! Fixed-struct codec for the producer configuration
//!
//! ```text
//! [period_ms: u16 LE][payload_len: u8]
//! ```

use crate::codec::cursor::{ByteReader, ByteWriter};
use crate::codec::CharacteristicCodec;
use crate::error::GattError;
use crate::model::{EntityModel, ProducerConfig};

/// Encoded size of [`ProducerConfig`]
pub const CONFIG_LEN: usize = 3;

/// Codec for the Config characteristic
pub struct ConfigCodec;

impl ConfigCodec {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ConfigCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacteristicCodec for ConfigCodec {
    fn encode(&self, model: &EntityModel, out: &mut [u8]) -> Result<usize, GattError> {
        if out.len() < CONFIG_LEN {
            return Err(GattError::BufferTooSmall);
        }
        let mut writer = ByteWriter::new(out);
        writer.write_u16_le(model.config.period_ms)?;
        writer.write_u8(model.config.payload_len)?;
        Ok(writer.len())
    }

    /// Takes effect on the next subscription, never on a running producer
    fn decode(&self, model: &mut EntityModel, input: &[u8]) -> Result<usize, GattError> {
        let mut reader = ByteReader::new(input);
        let config = ProducerConfig {
            period_ms: reader.read_u16_le()?,
            payload_len: reader.read_u8()?,
        };
        if !config.is_valid() {
            return Err(GattError::OutOfRange);
        }

        log::info!(
            "[gatt] producer config: period {} ms, payload {} bytes",
            config.period_ms,
            config.payload_len
        );
        model.config = config;
        Ok(reader.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::producer::MAX_PAYLOAD_LEN;

    #[test]
    fn test_encode_default() {
        let model = EntityModel::default();
        let mut buf = [0u8; CONFIG_LEN];

        let len = ConfigCodec::new().encode(&model, &mut buf).unwrap();
        assert_eq!(len, CONFIG_LEN);
        assert_eq!(buf, [100, 0, 20]);
    }

    #[test]
    fn test_decode_updates_config() {
        let mut model = EntityModel::default();
        let consumed = ConfigCodec::new()
            .decode(&mut model, &[0xF4, 0x01, 0x08])
            .unwrap();

        assert_eq!(consumed, CONFIG_LEN);
        assert_eq!(model.config.period_ms, 500);
        assert_eq!(model.config.payload_len, 8);
    }

    #[test]
    fn test_decode_truncated() {
        let mut model = EntityModel::default();
        let result = ConfigCodec::new().decode(&mut model, &[0x64, 0x00]);
        assert_eq!(result, Err(GattError::Truncated));
        assert_eq!(model.config, ProducerConfig::default());
    }

    #[test]
    fn test_decode_rejects_invalid_values() {
        let codec = ConfigCodec::new();
        let mut model = EntityModel::default();

        assert_eq!(codec.decode(&mut model, &[0x00, 0x00, 0x14]), Err(GattError::OutOfRange));
        assert_eq!(
            codec.decode(&mut model, &[0x64, 0x00, MAX_PAYLOAD_LEN + 1]),
            Err(GattError::OutOfRange)
        );
        assert_eq!(model.config, ProducerConfig::default());
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let model = EntityModel::default();
        let mut buf = [0u8; 2];
        assert_eq!(
            ConfigCodec::new().encode(&model, &mut buf),
            Err(GattError::BufferTooSmall)
        );
    }
}

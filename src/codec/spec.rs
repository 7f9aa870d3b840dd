//! Binary codec for the sensor channel description
//!
//! # Wire Format
//!
//! The four channels are sent back to back, in channel order:
//! ```text
//! [name: 8][unit: 8][count: u8][count x (physical: u32 LE, adc: u32 LE)]
//! ```
//!
//! Name and unit are NUL-padded, and the last byte of each is always NUL.
//! The ADC full-scale is 32 bits on the wire and 16 bits in memory; values
//! that do not fit 16 bits are rejected.

use crate::codec::cursor::{ByteReader, ByteWriter};
use crate::codec::CharacteristicCodec;
use crate::config::sensor::{CHANNEL_COUNT, MAX_RANGES, NAME_FIELD_LEN};
use crate::error::GattError;
use crate::model::sensor::derive_factor;
use crate::model::{EntityModel, FixedName, Range, Sensor};
use heapless::Vec;

/// Bytes per channel before its ranges
pub const CHANNEL_HEADER_LEN: usize = NAME_FIELD_LEN * 2 + 1;

/// Bytes per range
pub const RANGE_LEN: usize = 8;

/// Largest possible encoding (every channel with all ranges)
pub const MAX_ENCODED_LEN: usize = CHANNEL_COUNT * (CHANNEL_HEADER_LEN + MAX_RANGES * RANGE_LEN);

/// Decoded range pair, without the in-memory calibration factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeUpdate {
    pub physical: u32,
    pub adc: u16,
}

/// Decoded channel, not yet applied to the sensor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChannelUpdate {
    pub name: FixedName,
    pub unit: FixedName,
    pub ranges: Vec<RangeUpdate, MAX_RANGES>,
}

/// A fully validated channel description
///
/// Produced by [`SpecCodec::decode_update`] only when the whole input
/// checked out, so applying it can never leave the sensor half-written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecUpdate {
    pub channels: [ChannelUpdate; CHANNEL_COUNT],
}

impl SpecUpdate {
    /// Overwrite the channel fields of `sensor`
    ///
    /// A range whose full-scale pair is unchanged keeps its calibration
    /// factor. Any other range gets the factor implied by its full-scales.
    pub fn apply(&self, sensor: &mut Sensor) {
        for (channel, update) in sensor.channels.iter_mut().zip(self.channels.iter()) {
            channel.name = update.name;
            channel.unit = update.unit;

            let mut ranges: Vec<Range, MAX_RANGES> = Vec::new();
            for (i, r) in update.ranges.iter().enumerate() {
                let calibration = channel
                    .ranges
                    .get(i)
                    .filter(|old| old.physical == r.physical && old.adc == r.adc)
                    .map(|old| old.calibration)
                    .unwrap_or_else(|| derive_factor(r.physical, r.adc));
                // Both vectors share the MAX_RANGES bound
                let _ = ranges.push(Range {
                    physical: r.physical,
                    adc: r.adc,
                    calibration,
                });
            }
            channel.ranges = ranges;
        }
    }
}

/// Codec for the Spec characteristic
pub struct SpecCodec;

impl SpecCodec {
    pub const fn new() -> Self {
        Self
    }

    /// Number of bytes `encode_sensor` will write for `sensor`
    pub fn encoded_len(sensor: &Sensor) -> usize {
        sensor
            .channels
            .iter()
            .map(|c| CHANNEL_HEADER_LEN + c.ranges.len() * RANGE_LEN)
            .sum()
    }

    /// Encode all channels into `out`
    ///
    /// Nothing is written if `out` cannot hold the whole encoding.
    pub fn encode_sensor(&self, sensor: &Sensor, out: &mut [u8]) -> Result<usize, GattError> {
        if out.len() < Self::encoded_len(sensor) {
            return Err(GattError::BufferTooSmall);
        }

        let mut writer = ByteWriter::new(out);
        for channel in &sensor.channels {
            writer.append(channel.name.raw())?;
            writer.append(channel.unit.raw())?;
            writer.write_u8(channel.ranges.len() as u8)?;
            for range in &channel.ranges {
                writer.write_u32_le(range.physical)?;
                writer.write_u32_le(u32::from(range.adc))?;
            }
        }
        Ok(writer.len())
    }

    /// Decode and validate a channel description
    ///
    /// Returns the update and the number of input bytes it used.
    pub fn decode_update(&self, input: &[u8]) -> Result<(SpecUpdate, usize), GattError> {
        let mut reader = ByteReader::new(input);
        let mut update = SpecUpdate::default();

        for channel in update.channels.iter_mut() {
            channel.name = FixedName::from_bytes(reader.read_slice(NAME_FIELD_LEN)?);
            channel.unit = FixedName::from_bytes(reader.read_slice(NAME_FIELD_LEN)?);

            let count = usize::from(reader.read_u8()?);
            if count > MAX_RANGES {
                return Err(GattError::OutOfRange);
            }
            if reader.remaining() < count * RANGE_LEN {
                return Err(GattError::Truncated);
            }

            for _ in 0..count {
                let physical = reader.read_u32_le()?;
                let adc = u16::try_from(reader.read_u32_le()?).map_err(|_| GattError::OutOfRange)?;
                channel
                    .ranges
                    .push(RangeUpdate { physical, adc })
                    .map_err(|_| GattError::OutOfRange)?;
            }
        }

        Ok((update, reader.position()))
    }
}

impl Default for SpecCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacteristicCodec for SpecCodec {
    fn encode(&self, model: &EntityModel, out: &mut [u8]) -> Result<usize, GattError> {
        self.encode_sensor(&model.sensor, out)
    }

    fn decode(&self, model: &mut EntityModel, input: &[u8]) -> Result<usize, GattError> {
        let (update, consumed) = self.decode_update(input)?;
        update.apply(&mut model.sensor);
        log::info!("[gatt] sensor channels updated ({} bytes)", consumed);
        Ok(consumed)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::model::Channel;
    use alloc::string::String;
    use proptest::prelude::*;

    fn arb_channel() -> impl Strategy<Value = (String, String, alloc::vec::Vec<(u32, u16)>)> {
        (
            "[A-Za-z0-9 ]{0,12}",
            "[A-Za-z0-9]{0,12}",
            proptest::collection::vec((any::<u32>(), any::<u16>()), 0..=MAX_RANGES),
        )
    }

    fn arb_sensor() -> impl Strategy<Value = Sensor> {
        proptest::collection::vec(arb_channel(), CHANNEL_COUNT).prop_map(|channels| {
            let mut sensor = Sensor::default();
            for (channel, (name, unit, ranges)) in sensor.channels.iter_mut().zip(channels) {
                *channel = Channel {
                    name: FixedName::from_str_truncated(&name),
                    unit: FixedName::from_str_truncated(&unit),
                    ranges: ranges.into_iter().map(|(p, a)| Range::new(p, a)).collect(),
                };
            }
            sensor
        })
    }

    fn encode(sensor: &Sensor) -> alloc::vec::Vec<u8> {
        let mut buf = [0u8; MAX_ENCODED_LEN];
        let len = SpecCodec::new().encode_sensor(sensor, &mut buf).unwrap();
        buf[..len].to_vec()
    }

    proptest! {
        #[test]
        fn roundtrip_any_sensor(sensor in arb_sensor()) {
            let bytes = encode(&sensor);
            prop_assert_eq!(bytes.len(), SpecCodec::encoded_len(&sensor));

            let (update, consumed) = SpecCodec::new().decode_update(&bytes).unwrap();
            prop_assert_eq!(consumed, bytes.len());

            let mut decoded = Sensor::default();
            update.apply(&mut decoded);
            prop_assert_eq!(decoded.channels, sensor.channels);
        }

        #[test]
        fn every_proper_prefix_fails(sensor in arb_sensor()) {
            let bytes = encode(&sensor);
            for cut in 0..bytes.len() {
                prop_assert!(SpecCodec::new().decode_update(&bytes[..cut]).is_err(), "prefix {} decoded", cut);
            }
        }
    }
}

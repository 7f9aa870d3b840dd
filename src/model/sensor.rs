//! Multi-channel sensor description
//!
//! A [`Sensor`] always carries exactly [`CHANNEL_COUNT`] channels, each with
//! at most [`MAX_RANGES`] calibration ranges. Both bounds are enforced by the
//! types (a fixed array and a bounded vector), so no code path can grow them.

use crate::config::sensor::{
    CHANNEL_COUNT, DEFAULT_ADC_FULL_SCALE, DEFAULT_NAME, DEFAULT_SERIAL, FORCE_RANGES, MAX_RANGES,
    MOMENT_RANGES, NAME_FIELD_LEN,
};
use heapless::Vec;

/// Fixed-capacity, NUL-terminated name or unit field
///
/// Input longer than the field is truncated. The last byte is always a
/// terminator, so at most `NAME_FIELD_LEN - 1` characters are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedName {
    bytes: [u8; NAME_FIELD_LEN],
}

impl FixedName {
    /// Build a field from raw bytes, truncating and terminating
    pub fn from_bytes(src: &[u8]) -> Self {
        let mut bytes = [0u8; NAME_FIELD_LEN];
        let len = src.len().min(NAME_FIELD_LEN);
        bytes[..len].copy_from_slice(&src[..len]);
        bytes[NAME_FIELD_LEN - 1] = 0;
        Self { bytes }
    }

    /// Build a field from a string, truncating and terminating
    pub fn from_str_truncated(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// The full field as stored, padding included
    pub fn raw(&self) -> &[u8; NAME_FIELD_LEN] {
        &self.bytes
    }

    /// Bytes up to the first terminator
    pub fn as_bytes(&self) -> &[u8] {
        let end = self.bytes.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_LEN);
        &self.bytes[..end]
    }

    /// Text up to the first terminator, or `None` if it is not UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.as_bytes()).ok()
    }
}

/// One calibration range of a channel
///
/// The ADC full-scale is 32 bits wide on the wire but held in 16 bits here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    /// Physical full-scale value
    pub physical: u32,
    /// ADC full-scale value
    pub adc: u16,
    /// Physical units per ADC count (not transmitted)
    pub calibration: f32,
}

impl Range {
    /// Create a range with the calibration factor derived from the two full-scales
    pub fn new(physical: u32, adc: u16) -> Self {
        Self {
            physical,
            adc,
            calibration: derive_factor(physical, adc),
        }
    }
}

/// Calibration factor implied by a pair of full-scale values
pub(crate) fn derive_factor(physical: u32, adc: u16) -> f32 {
    if adc == 0 {
        0.0
    } else {
        physical as f32 / f32::from(adc)
    }
}

/// One measurement channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Channel {
    pub name: FixedName,
    pub unit: FixedName,
    pub ranges: Vec<Range, MAX_RANGES>,
}

impl Channel {
    fn with_ranges(name: &str, unit: &str, physical: &[u32; MAX_RANGES]) -> Self {
        let ranges = physical
            .iter()
            .map(|&p| Range::new(p, DEFAULT_ADC_FULL_SCALE))
            .collect();
        Self {
            name: FixedName::from_str_truncated(name),
            unit: FixedName::from_str_truncated(unit),
            ranges,
        }
    }
}

/// The sensor attached to the device
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub name: FixedName,
    pub serial: u32,
    pub channels: [Channel; CHANNEL_COUNT],
}

impl Default for Sensor {
    /// Three force axes and one moment axis with four ranges each
    fn default() -> Self {
        Self {
            name: FixedName::from_str_truncated(DEFAULT_NAME),
            serial: DEFAULT_SERIAL,
            channels: [
                Channel::with_ranges("Fx", "N", &FORCE_RANGES),
                Channel::with_ranges("Fy", "N", &FORCE_RANGES),
                Channel::with_ranges("Fz", "N", &FORCE_RANGES),
                Channel::with_ranges("Mz", "Nm", &MOMENT_RANGES),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_truncated_to_seven_chars() {
        let name = FixedName::from_str_truncated("Temperature");
        assert_eq!(name.as_str(), Some("Tempera"));
        assert_eq!(name.raw()[NAME_FIELD_LEN - 1], 0);
    }

    #[test]
    fn test_name_terminator_forced_on_exact_fit() {
        let name = FixedName::from_bytes(b"ABCDEFGH");
        assert_eq!(name.as_bytes(), b"ABCDEFG");
    }

    #[test]
    fn test_short_name_zero_padded() {
        let name = FixedName::from_str_truncated("Fx");
        assert_eq!(name.raw(), &[b'F', b'x', 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_default_sensor_layout() {
        let sensor = Sensor::default();
        assert_eq!(sensor.name.as_str(), Some("WRCD"));
        assert_eq!(sensor.channels.len(), CHANNEL_COUNT);
        for channel in &sensor.channels {
            assert_eq!(channel.ranges.len(), MAX_RANGES);
        }
        assert_eq!(sensor.channels[3].unit.as_str(), Some("Nm"));
        assert_eq!(sensor.channels[0].ranges[0].physical, 500);
    }

    #[test]
    fn test_calibration_factor_derived() {
        let range = Range::new(32_767, 32_767);
        assert_eq!(range.calibration, 1.0);
        assert_eq!(Range::new(100, 0).calibration, 0.0);
    }
}

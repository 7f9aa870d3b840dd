//! Wire formats matching the firmware.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use uuid::Uuid;

/// WRCD service and characteristics
pub const WRCD_SERVICE_UUID: Uuid = Uuid::from_u128(0x00000100_f5bf_58d5_9d17_172177d1316a);
pub const STATE_UUID: Uuid = Uuid::from_u128(0x00000101_f5bf_58d5_9d17_172177d1316a);
pub const SPEC_UUID: Uuid = Uuid::from_u128(0x00000102_f5bf_58d5_9d17_172177d1316a);
pub const STATUS_UUID: Uuid = Uuid::from_u128(0x00000103_f5bf_58d5_9d17_172177d1316a);
pub const DATA_UUID: Uuid = Uuid::from_u128(0x00000104_f5bf_58d5_9d17_172177d1316a);
pub const CALIBRATION_UUID: Uuid = Uuid::from_u128(0x00000105_f5bf_58d5_9d17_172177d1316a);

/// Simulator service: sampling interval and payload length
pub const CONFIG_UUID: Uuid = Uuid::from_u128(0xffffff11_f5bf_58d5_9d17_172177d1316a);

pub const CHANNEL_COUNT: usize = 4;
pub const MAX_RANGES: usize = 4;
const NAME_LEN: usize = 8;

/// One channel of the Spec characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub unit: String,
    /// (physical full-scale, ADC full-scale)
    pub ranges: Vec<(u32, u32)>,
}

fn read_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    let mut field = [0u8; NAME_LEN];
    let n = name.len().min(NAME_LEN - 1);
    field[..n].copy_from_slice(&name.as_bytes()[..n]);
    out.extend_from_slice(&field);
}

/// Decode the Spec value into its four channels.
pub fn decode_spec(bytes: &[u8]) -> Result<Vec<ChannelSpec>> {
    let mut channels = Vec::with_capacity(CHANNEL_COUNT);
    let mut pos = 0;

    for index in 0..CHANNEL_COUNT {
        let header = bytes
            .get(pos..pos + 2 * NAME_LEN + 1)
            .ok_or_else(|| anyhow!("channel {} header truncated", index))?;
        let count = header[2 * NAME_LEN] as usize;
        if count > MAX_RANGES {
            bail!("channel {} has {} ranges", index, count);
        }
        pos += header.len();

        let body = bytes
            .get(pos..pos + count * 8)
            .ok_or_else(|| anyhow!("channel {} ranges truncated", index))?;
        let ranges = body
            .chunks_exact(8)
            .map(|r| {
                (
                    u32::from_le_bytes([r[0], r[1], r[2], r[3]]),
                    u32::from_le_bytes([r[4], r[5], r[6], r[7]]),
                )
            })
            .collect();
        pos += body.len();

        channels.push(ChannelSpec {
            name: read_name(&header[..NAME_LEN]),
            unit: read_name(&header[NAME_LEN..2 * NAME_LEN]),
            ranges,
        });
    }

    Ok(channels)
}

/// Encode four channels into a Spec value.
pub fn encode_spec(channels: &[ChannelSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    for channel in channels {
        write_name(&mut out, &channel.name);
        write_name(&mut out, &channel.unit);
        out.push(channel.ranges.len() as u8);
        for (physical, adc) in &channel.ranges {
            out.extend_from_slice(&physical.to_le_bytes());
            out.extend_from_slice(&adc.to_le_bytes());
        }
    }
    out
}

/// Encode the Config value: period u16 LE, payload length u8.
pub fn encode_config(period_ms: u16, payload_len: u8) -> Vec<u8> {
    let mut out = period_ms.to_le_bytes().to_vec();
    out.push(payload_len);
    out
}

/// Decode the Config value into (period_ms, payload_len).
pub fn decode_config(bytes: &[u8]) -> Result<(u16, u8)> {
    match bytes {
        [lo, hi, len, ..] => Ok((u16::from_le_bytes([*lo, *hi]), *len)),
        _ => bail!("config value is {} bytes", bytes.len()),
    }
}

/// Tracks the cycling byte counter across Data notifications.
#[derive(Debug, Default)]
pub struct PatternChecker {
    expected: Option<u8>,
    pub bytes: usize,
    pub breaks: usize,
}

impl PatternChecker {
    /// Check one notification; the first byte ever seen sets the phase.
    pub fn check(&mut self, payload: &[u8]) -> bool {
        let mut ok = true;
        for &byte in payload {
            if let Some(expected) = self.expected {
                if byte != expected {
                    ok = false;
                }
            }
            self.expected = Some(byte.wrapping_add(1));
        }
        if !ok {
            self.breaks += 1;
        }
        self.bytes += payload.len();
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_channels() -> Vec<ChannelSpec> {
        ["Fx", "Fy", "Fz", "Mz"]
            .iter()
            .map(|name| ChannelSpec {
                name: name.to_string(),
                unit: "N".to_string(),
                ranges: vec![(500, 32767), (1000, 32767)],
            })
            .collect()
    }

    #[test]
    fn test_spec_roundtrip() {
        let channels = default_channels();
        let bytes = encode_spec(&channels);
        assert_eq!(bytes.len(), 4 * (17 + 16));
        assert_eq!(decode_spec(&bytes).unwrap(), channels);
    }

    #[test]
    fn test_spec_truncated() {
        let bytes = encode_spec(&default_channels());
        assert!(decode_spec(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_config() {
        assert_eq!(encode_config(100, 20), vec![100, 0, 20]);
        assert_eq!(decode_config(&[0xF4, 0x01, 8]).unwrap(), (500, 8));
        assert!(decode_config(&[1, 2]).is_err());
    }

    #[test]
    fn test_pattern_continuity() {
        let mut checker = PatternChecker::default();
        assert!(checker.check(&[254, 255]));
        assert!(checker.check(&[0, 1, 2]));
        assert!(!checker.check(&[4]));
        assert_eq!(checker.breaks, 1);
        assert_eq!(checker.bytes, 6);
    }
}

//! Small records held next to the sensor description

use crate::config::calibration::CAPACITY as CALIBRATION_CAPACITY;
use crate::config::producer::{DEFAULT_PAYLOAD_LEN, DEFAULT_PERIOD_MS, MAX_PAYLOAD_LEN, MIN_PERIOD_MS};
use alloc::string::String;
use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Free-form device state exchanged as JSON
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub foo: i32,
    pub bar: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            foo: 1,
            bar: String::from("bar"),
        }
    }
}

/// Period and payload length used when the Data producer starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerConfig {
    pub period_ms: u16,
    pub payload_len: u8,
}

impl ProducerConfig {
    /// Check both fields against the producer bounds
    pub fn is_valid(&self) -> bool {
        self.period_ms >= MIN_PERIOD_MS && self.payload_len >= 1 && self.payload_len <= MAX_PAYLOAD_LEN
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            period_ms: DEFAULT_PERIOD_MS,
            payload_len: DEFAULT_PAYLOAD_LEN,
        }
    }
}

/// Opaque calibration blob, stored and returned unchanged
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Calibration {
    pub data: Vec<u8, CALIBRATION_CAPACITY>,
}

/// Notification counters, exposed through the Status characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NotifyStats {
    /// Notifications handed to the stack
    pub sent: u32,
    /// Notify-send failures
    pub failed: u32,
    /// Ticks dropped because the producer fell behind
    pub skipped: u32,
}

impl NotifyStats {
    pub fn record_sent(&mut self) {
        self.sent = self.sent.wrapping_add(1);
    }

    pub fn record_failed(&mut self) {
        self.failed = self.failed.wrapping_add(1);
    }

    pub fn record_skipped(&mut self, ticks: u32) {
        self.skipped = self.skipped.wrapping_add(ticks);
    }
}

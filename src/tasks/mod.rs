//! Embassy tasks module
//!
//! The BLE host task and the per-connection Data producer it runs.

pub mod ble;
pub mod producer;

pub use ble::ble_task;
pub use producer::{producer_loop, ConnectionSink};

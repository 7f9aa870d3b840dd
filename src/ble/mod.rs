//! Bluetooth Low Energy module
//!
//! GATT server definition for the WRCD and simulator services.

pub mod service;

pub use service::{Server, SimulatorService, WrcdService};

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod model;
pub mod notify;
pub mod protocol;
pub mod scheduler;

// These modules depend on the radio stack only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod ble;
#[cfg(feature = "embedded")]
pub mod tasks;

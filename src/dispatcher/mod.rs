//! GATT event dispatch
//!
//! [`table`] names the characteristics and what a peer may do with them,
//! [`handler`] routes the stack's callbacks to codecs and the scheduler.

pub mod handler;
pub mod table;

pub use handler::Dispatcher;
pub use table::{CharacteristicId, Properties};

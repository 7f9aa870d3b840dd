pub mod traits;

pub use traits::NotifySink;

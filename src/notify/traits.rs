//! Notify-send trait for abstraction and testability
//!
//! This trait defines the push side of the GATT stack, allowing the real
//! connection to be swapped with a mock for testing.

use crate::dispatcher::CharacteristicId;
use crate::error::GattError;
use core::future::Future;

/// Abstract notify-send interface
///
/// Implementations deliver `data` as a notification of `characteristic` to
/// the subscribed peer. A failure is transient: the caller counts it and
/// carries on.
pub trait NotifySink {
    /// Send one notification
    ///
    /// Fails with [`GattError::NotifyTransientFailure`] when the payload could
    /// not be queued.
    fn notify(
        &mut self,
        characteristic: CharacteristicId,
        data: &[u8],
    ) -> impl Future<Output = Result<(), GattError>>;
}

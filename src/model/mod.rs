//! Entity model
//!
//! All mutable device data lives in one [`EntityModel`], and the only way to
//! reach it from either execution context is through [`SharedModel::lock`].
//! Codec writes from the GATT callback context and payload builds in the
//! producer context therefore never interleave.

pub mod record;
pub mod sensor;

pub use record::{Calibration, NotifyStats, ProducerConfig, State};
pub use sensor::{Channel, FixedName, Range, Sensor};

use crate::dispatcher::CharacteristicId;
use crate::scheduler::Subscription;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};

/// Notification state of the notifiable characteristics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Subscriptions {
    /// State is pushed on write only, so a flag is all it needs
    pub state_notify: bool,
    pub data: Subscription,
}

impl Subscriptions {
    /// Producer-backed subscription of `id`
    pub fn get(&self, id: CharacteristicId) -> Option<&Subscription> {
        match id {
            CharacteristicId::Data => Some(&self.data),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, id: CharacteristicId) -> Option<&mut Subscription> {
        match id {
            CharacteristicId::Data => Some(&mut self.data),
            _ => None,
        }
    }
}

/// Everything the characteristics read and write
#[derive(Debug, Clone, Default)]
pub struct EntityModel {
    pub sensor: Sensor,
    pub state: State,
    pub config: ProducerConfig,
    pub calibration: Calibration,
    pub subscriptions: Subscriptions,
    pub stats: NotifyStats,
}

/// The entity model behind its single lock
pub struct SharedModel<M: RawMutex> {
    inner: Mutex<M, EntityModel>,
}

impl<M: RawMutex> SharedModel<M> {
    pub fn new(model: EntityModel) -> Self {
        Self {
            inner: Mutex::new(model),
        }
    }

    /// Wait for exclusive access to the model
    pub async fn lock(&self) -> MutexGuard<'_, M, EntityModel> {
        self.inner.lock().await
    }
}

impl<M: RawMutex> Default for SharedModel<M> {
    fn default() -> Self {
        Self::new(EntityModel::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    #[test]
    fn test_subscription_lookup() {
        let subs = Subscriptions::default();
        assert!(subs.get(CharacteristicId::Data).is_some());
        assert!(subs.get(CharacteristicId::State).is_some());
        assert!(subs.get(CharacteristicId::Spec).is_none());
    }

    #[test]
    fn test_lock_mutation_visible() {
        let shared: SharedModel<CriticalSectionRawMutex> = SharedModel::default();

        futures::executor::block_on(async {
            shared.lock().await.state.foo = 42;
            assert_eq!(shared.lock().await.state.foo, 42);
        });
    }
}

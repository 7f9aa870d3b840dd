//! Notification scheduler
//!
//! A [`Scheduler`] drives one notifiable characteristic. The GATT callback
//! context calls [`Scheduler::on_subscription_change`]; the producer context
//! waits for [`ProducerCommand`]s and calls [`Scheduler::tick`] once per
//! period.
//!
//! Stopping is synchronous with the unsubscribe: a tick holds the model lock
//! from the subscription check until notify-send returns, and the
//! unsubscribe flips the subscription under the same lock. Once
//! `on_subscription_change(false)` returns, no tick can emit again.

pub mod pacing;
pub mod producer;
pub mod subscription;

pub use pacing::Pacer;
pub use producer::{PatternGenerator, MAX_PAYLOAD};
pub use subscription::{ProducerPlan, Subscription, Transition};

use crate::dispatcher::CharacteristicId;
use crate::model::SharedModel;
use crate::notify::NotifySink;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

/// Request for the producer context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerCommand {
    /// Run with this plan, replacing any previous one
    Start(ProducerPlan),
    /// Go idle
    Stop,
}

/// Result of one producer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Payload handed to notify-send
    Sent,
    /// Notify-send failed; the next tick retries
    Failed,
    /// The plan is no longer current, the producer must stop
    Stopped,
}

/// Subscription-gated periodic producer for one characteristic
pub struct Scheduler<M: RawMutex> {
    characteristic: CharacteristicId,
    control: Signal<M, ProducerCommand>,
}

impl<M: RawMutex> Scheduler<M> {
    pub const fn new(characteristic: CharacteristicId) -> Self {
        Self {
            characteristic,
            control: Signal::new(),
        }
    }

    pub fn characteristic(&self) -> CharacteristicId {
        self.characteristic
    }

    /// Apply a CCC change and tell the producer context
    ///
    /// On enable the current producer config is snapshotted into a new plan.
    pub async fn on_subscription_change(&self, model: &SharedModel<M>, enabled: bool) -> Transition {
        let transition = {
            let mut guard = model.lock().await;
            let m = &mut *guard;
            match m.subscriptions.get_mut(self.characteristic) {
                Some(sub) => sub.transition(enabled, &m.config),
                None => Transition::Unchanged,
            }
        };

        match transition {
            Transition::Started(plan) => {
                log::info!(
                    "[producer] {:?} subscribed: every {} ms, {} bytes",
                    self.characteristic,
                    plan.period_ms,
                    plan.payload_len
                );
                self.control.signal(ProducerCommand::Start(plan));
            }
            Transition::Stopped => {
                log::info!("[producer] {:?} unsubscribed", self.characteristic);
                self.control.signal(ProducerCommand::Stop);
            }
            Transition::Enabled | Transition::Unchanged => {}
        }
        transition
    }

    /// Wait for the next start/stop request
    pub async fn wait_command(&self) -> ProducerCommand {
        self.control.wait().await
    }

    /// Take a pending start/stop request without waiting
    #[cfg(test)]
    pub fn try_command(&self) -> Option<ProducerCommand> {
        self.control.try_take()
    }

    /// Build and send one payload if `plan` is still current
    pub async fn tick<S: NotifySink>(
        &self,
        model: &SharedModel<M>,
        plan: &ProducerPlan,
        generator: &mut PatternGenerator,
        sink: &mut S,
    ) -> TickOutcome {
        let mut guard = model.lock().await;

        let current = guard
            .subscriptions
            .get(self.characteristic)
            .is_some_and(|sub| sub.is_current(plan));
        if !current {
            return TickOutcome::Stopped;
        }

        let payload = generator.next_payload(plan.payload_len);

        // Lock held until notify-send returns so an unsubscribe cannot overtake it
        match sink.notify(self.characteristic, &payload).await {
            Ok(()) => {
                guard.stats.record_sent();
                TickOutcome::Sent
            }
            Err(e) => {
                guard.stats.record_failed();
                log::warn!("[producer] notify failed: {}", e);
                TickOutcome::Failed
            }
        }
    }

    /// Count ticks dropped by the pacer
    pub async fn record_skipped(&self, model: &SharedModel<M>, ticks: u32) {
        if ticks > 0 {
            log::debug!("[producer] skipped {} ticks", ticks);
            model.lock().await.stats.record_skipped(ticks);
        }
    }
}

//! Per-characteristic subscription state machine

use crate::config::producer::MAX_NOTIFY_TIMEOUT_MS;
use crate::model::ProducerConfig;

/// What a producer runs with, captured when notifications are enabled
///
/// Config writes after the snapshot do not reach a running producer. The
/// epoch tells a producer whether its plan is still the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerPlan {
    pub period_ms: u32,
    pub payload_len: usize,
    pub epoch: u32,
}

impl ProducerPlan {
    /// How long one notify-send may take: a period, capped
    pub fn notify_timeout_ms(&self) -> u32 {
        self.period_ms.min(MAX_NOTIFY_TIMEOUT_MS)
    }
}

/// Subscription state of one notifiable characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribed(ProducerPlan),
}

/// Result of applying a CCC value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Entered `Subscribed` with a fresh plan
    Started(ProducerPlan),
    /// Notifications enabled on a characteristic without a producer
    Enabled,
    /// Left `Subscribed`
    Stopped,
    /// Already in the requested state
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    state: SubscriptionState,
    epoch: u32,
}

impl Subscription {
    pub const fn new() -> Self {
        Self {
            state: SubscriptionState::Unsubscribed,
            epoch: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, SubscriptionState::Subscribed(_))
    }

    /// Current plan, if subscribed
    pub fn plan(&self) -> Option<ProducerPlan> {
        match self.state {
            SubscriptionState::Subscribed(plan) => Some(plan),
            SubscriptionState::Unsubscribed => None,
        }
    }

    /// True while `plan` is the plan this subscription was last started with
    pub fn is_current(&self, plan: &ProducerPlan) -> bool {
        self.plan().as_ref() == Some(plan)
    }

    /// Apply an enable/disable request, snapshotting `config` on enable
    pub fn transition(&mut self, enabled: bool, config: &ProducerConfig) -> Transition {
        match (self.state, enabled) {
            (SubscriptionState::Unsubscribed, true) => {
                self.epoch = self.epoch.wrapping_add(1);
                let plan = ProducerPlan {
                    period_ms: u32::from(config.period_ms),
                    payload_len: usize::from(config.payload_len),
                    epoch: self.epoch,
                };
                self.state = SubscriptionState::Subscribed(plan);
                Transition::Started(plan)
            }
            (SubscriptionState::Subscribed(_), false) => {
                self.state = SubscriptionState::Unsubscribed;
                Transition::Stopped
            }
            _ => Transition::Unchanged,
        }
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

//! Characteristic dispatcher
//!
//! Routes the read, write and CCC callbacks of one connection to the codec
//! or scheduler owning the characteristic. All model access goes through the
//! shared model lock; value buffers are owned per call.

use super::table::CharacteristicId;
use crate::codec::{CalibrationCodec, CharacteristicCodec, ConfigCodec, SpecCodec, StateCodec, StatusCodec};
use crate::config::protocol::{CCC_NOTIFY, MAX_VALUE_SIZE, PREPARE_BUFFER_SIZE};
use crate::error::GattError;
use crate::model::SharedModel;
use crate::notify::NotifySink;
use crate::protocol::WriteAssembler;
use crate::scheduler::{Scheduler, Transition};
use embassy_sync::blocking_mutex::raw::RawMutex;

static STATE_CODEC: StateCodec = StateCodec::new();
static SPEC_CODEC: SpecCodec = SpecCodec::new();
static STATUS_CODEC: StatusCodec = StatusCodec::new();
static CALIBRATION_CODEC: CalibrationCodec = CalibrationCodec::new();
static CONFIG_CODEC: ConfigCodec = ConfigCodec::new();

/// Codec serving a characteristic's value, `None` for notify-only ones
fn codec_for(id: CharacteristicId) -> Option<&'static dyn CharacteristicCodec> {
    match id {
        CharacteristicId::State => Some(&STATE_CODEC),
        CharacteristicId::Spec => Some(&SPEC_CODEC),
        CharacteristicId::Status => Some(&STATUS_CODEC),
        CharacteristicId::Calibration => Some(&CALIBRATION_CODEC),
        CharacteristicId::Config => Some(&CONFIG_CODEC),
        CharacteristicId::Data => None,
    }
}

/// Per-connection GATT event handler
pub struct Dispatcher<'a, M: RawMutex> {
    model: &'a SharedModel<M>,
    data: &'a Scheduler<M>,
    assembler: WriteAssembler<PREPARE_BUFFER_SIZE>,
    /// Characteristic the pending fragments belong to
    pending: Option<CharacteristicId>,
}

impl<'a, M: RawMutex> Dispatcher<'a, M> {
    pub fn new(model: &'a SharedModel<M>, data: &'a Scheduler<M>) -> Self {
        Self {
            model,
            data,
            assembler: WriteAssembler::new(),
            pending: None,
        }
    }

    /// Serve a read of `id` starting at `offset`
    ///
    /// Copies at most `max_len` bytes (and at most `out.len()`) and returns
    /// how many were copied.
    pub async fn on_read(
        &self,
        id: CharacteristicId,
        offset: usize,
        max_len: usize,
        out: &mut [u8],
    ) -> Result<usize, GattError> {
        if !id.properties().read {
            return Err(GattError::ReadNotPermitted);
        }
        let codec = codec_for(id).ok_or(GattError::ReadNotPermitted)?;

        let mut value = [0u8; MAX_VALUE_SIZE];
        let len = {
            let model = self.model.lock().await;
            codec.encode(&model, &mut value)?
        };

        if offset > len {
            return Err(GattError::InvalidOffset);
        }
        let n = (len - offset).min(max_len).min(out.len());
        out[..n].copy_from_slice(&value[offset..offset + n]);
        Ok(n)
    }

    /// Handle a write fragment of `id`
    ///
    /// Non-final fragments are only buffered and report zero bytes consumed.
    /// The final fragment decodes the assembled value into the model.
    pub async fn on_write(
        &mut self,
        id: CharacteristicId,
        offset: usize,
        data: &[u8],
        is_final: bool,
    ) -> Result<usize, GattError> {
        if !id.properties().write {
            return Err(GattError::WriteNotPermitted);
        }
        let codec = codec_for(id).ok_or(GattError::WriteNotPermitted)?;

        if self.pending.is_some_and(|p| p != id) {
            log::warn!("[gatt] dropping {} pending bytes of {:?}", self.assembler.len(), self.pending);
            self.discard_pending();
        }

        if !is_final {
            if let Err(e) = self.assembler.push(offset, data) {
                self.discard_pending();
                return Err(e);
            }
            self.pending = Some(id);
            return Ok(0);
        }

        let result = if self.assembler.is_empty() && offset == 0 {
            Self::decode(self.model, codec, data).await
        } else {
            match self.assembler.push(offset, data) {
                Ok(()) => Self::decode(self.model, codec, self.assembler.as_slice()).await,
                Err(e) => Err(e),
            }
        };
        self.discard_pending();

        if let Err(e) = result {
            log::warn!("[gatt] write to {:?} rejected: {}", id, e);
        }
        result
    }

    async fn decode(
        model: &SharedModel<M>,
        codec: &dyn CharacteristicCodec,
        input: &[u8],
    ) -> Result<usize, GattError> {
        let mut model = model.lock().await;
        codec.decode(&mut model, input)
    }

    fn discard_pending(&mut self) {
        self.assembler.reset();
        self.pending = None;
    }

    /// Apply a CCC write of `value` to `id`
    ///
    /// Only [`CCC_NOTIFY`] enables; any other value disables.
    pub async fn on_subscription_change(
        &mut self,
        id: CharacteristicId,
        value: u16,
    ) -> Result<Transition, GattError> {
        if !id.properties().notify {
            return Err(GattError::WriteNotPermitted);
        }
        let enabled = value == CCC_NOTIFY;

        if id == self.data.characteristic() {
            return Ok(self.data.on_subscription_change(self.model, enabled).await);
        }

        let mut model = self.model.lock().await;
        let transition = match id {
            CharacteristicId::State if model.subscriptions.state_notify != enabled => {
                model.subscriptions.state_notify = enabled;
                if enabled {
                    Transition::Enabled
                } else {
                    Transition::Stopped
                }
            }
            _ => Transition::Unchanged,
        };
        log::debug!("[gatt] {:?} CCC={:#06x}: {:?}", id, value, transition);
        Ok(transition)
    }

    /// Push the current State to the peer if it subscribed
    ///
    /// Returns whether a notification was sent.
    pub async fn notify_state<S: NotifySink>(&self, sink: &mut S) -> Result<bool, GattError> {
        let model = self.model.lock().await;
        if !model.subscriptions.state_notify {
            return Ok(false);
        }

        let mut value = [0u8; MAX_VALUE_SIZE];
        let len = STATE_CODEC.encode(&model, &mut value)?;
        sink.notify(CharacteristicId::State, &value[..len]).await?;
        Ok(true)
    }

    /// Connection lost: drop pending fragments and every subscription
    pub async fn disconnect(&mut self) {
        self.discard_pending();

        for id in CharacteristicId::ALL {
            if id.properties().notify {
                let _ = self.on_subscription_change(id, 0).await;
            }
        }
        log::info!("[gatt] connection state cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProducerConfig;
    use crate::notify::traits::mock::MockNotifySink;
    use crate::scheduler::{PatternGenerator, ProducerCommand, TickOutcome};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use futures::executor::block_on;

    type TestModel = SharedModel<CriticalSectionRawMutex>;
    type TestScheduler = Scheduler<CriticalSectionRawMutex>;

    const STATE_JSON: &[u8] = br#"{"foo":1,"bar":"bar"}"#;

    fn fixture() -> (TestModel, TestScheduler) {
        (TestModel::default(), TestScheduler::new(CharacteristicId::Data))
    }

    #[test]
    fn test_read_state() {
        let (model, scheduler) = fixture();
        let dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 64];

        let n = block_on(dispatcher.on_read(CharacteristicId::State, 0, 64, &mut out)).unwrap();
        assert_eq!(&out[..n], STATE_JSON);
    }

    #[test]
    fn test_read_with_offset_and_max_len() {
        let (model, scheduler) = fixture();
        let dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 64];

        let n = block_on(dispatcher.on_read(CharacteristicId::State, 5, 4, &mut out)).unwrap();
        assert_eq!(&out[..n], br#"":1,"#);

        // Limited by the destination as well
        let mut small = [0u8; 2];
        let n = block_on(dispatcher.on_read(CharacteristicId::State, 0, 64, &mut small)).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&small, b"{\"");
    }

    #[test]
    fn test_read_offset_at_and_past_end() {
        let (model, scheduler) = fixture();
        let dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 64];
        let len = STATE_JSON.len();

        assert_eq!(block_on(dispatcher.on_read(CharacteristicId::State, len, 64, &mut out)), Ok(0));
        assert_eq!(
            block_on(dispatcher.on_read(CharacteristicId::State, len + 1, 64, &mut out)),
            Err(GattError::InvalidOffset)
        );
    }

    #[test]
    fn test_read_spec_length() {
        let (model, scheduler) = fixture();
        let dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 512];

        // Four channels of 17 header bytes and four 8 byte ranges each
        let n = block_on(dispatcher.on_read(CharacteristicId::Spec, 0, 512, &mut out)).unwrap();
        assert_eq!(n, 4 * (17 + 4 * 8));
        assert_eq!(&out[..3], b"Fx\0");
    }

    #[test]
    fn test_capability_checks() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 16];

        assert_eq!(
            block_on(dispatcher.on_read(CharacteristicId::Data, 0, 16, &mut out)),
            Err(GattError::ReadNotPermitted)
        );
        assert_eq!(
            block_on(dispatcher.on_write(CharacteristicId::Status, 0, b"{}", true)),
            Err(GattError::WriteNotPermitted)
        );
        assert_eq!(
            block_on(dispatcher.on_subscription_change(CharacteristicId::Spec, 1)),
            Err(GattError::WriteNotPermitted)
        );
    }

    #[test]
    fn test_write_state() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);
        let input = br#"{"foo":7,"bar":"baz"}"#;

        let n = block_on(dispatcher.on_write(CharacteristicId::State, 0, input, true)).unwrap();
        assert_eq!(n, input.len());

        let state = block_on(model.lock()).state.clone();
        assert_eq!(state.foo, 7);
        assert_eq!(state.bar, "baz");
    }

    #[test]
    fn test_prepare_fragments_decode_on_final() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);
        let input = br#"{"foo":42,"bar":"fragmented"}"#;
        let (first, rest) = input.split_at(10);
        let (second, last) = rest.split_at(10);

        block_on(async {
            assert_eq!(dispatcher.on_write(CharacteristicId::State, 0, first, false).await, Ok(0));
            assert_eq!(dispatcher.on_write(CharacteristicId::State, 10, second, false).await, Ok(0));
            assert_eq!(model.lock().await.state.foo, 1);

            let n = dispatcher.on_write(CharacteristicId::State, 20, last, true).await.unwrap();
            assert_eq!(n, input.len());
        });

        let state = block_on(model.lock()).state.clone();
        assert_eq!(state.foo, 42);
        assert_eq!(state.bar, "fragmented");
    }

    #[test]
    fn test_fragment_gap_rejected() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        block_on(async {
            dispatcher.on_write(CharacteristicId::State, 0, br#"{"foo":"#, false).await.unwrap();
            assert_eq!(
                dispatcher.on_write(CharacteristicId::State, 12, br#"2,"bar":"x"}"#, true).await,
                Err(GattError::InvalidOffset)
            );
            assert_eq!(model.lock().await.state.foo, 1);

            // Assembler was reset, a fresh write goes through
            let input = br#"{"foo":3,"bar":"x"}"#;
            assert_eq!(dispatcher.on_write(CharacteristicId::State, 0, input, true).await, Ok(input.len()));
        });
    }

    #[test]
    fn test_final_write_at_offset_without_fragments() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        assert_eq!(
            block_on(dispatcher.on_write(CharacteristicId::Config, 1, &[0x01, 0x08], true)),
            Err(GattError::InvalidOffset)
        );
    }

    #[test]
    fn test_fragment_of_other_characteristic_drops_pending() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        block_on(async {
            dispatcher.on_write(CharacteristicId::State, 0, br#"{"foo":"#, false).await.unwrap();
            assert_eq!(dispatcher.on_write(CharacteristicId::Config, 0, &[0xF4, 0x01, 8], true).await, Ok(3));
            // The State fragment is gone, continuing it is a gap
            assert_eq!(
                dispatcher.on_write(CharacteristicId::State, 7, br#"2,"bar":"x"}"#, true).await,
                Err(GattError::InvalidOffset)
            );
        });
    }

    #[test]
    fn test_malformed_state_leaves_model() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        assert_eq!(
            block_on(dispatcher.on_write(CharacteristicId::State, 0, br#"{"foo":"one","bar":"x"}"#, true)),
            Err(GattError::ParseError)
        );
        assert_eq!(block_on(model.lock()).state.bar, "bar");
    }

    #[test]
    fn test_write_config_then_read() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 8];

        block_on(async {
            assert_eq!(dispatcher.on_write(CharacteristicId::Config, 0, &[0xF4, 0x01, 8], true).await, Ok(3));
            let n = dispatcher.on_read(CharacteristicId::Config, 0, 8, &mut out).await.unwrap();
            assert_eq!(&out[..n], &[0xF4, 0x01, 8]);
        });
        assert_eq!(
            block_on(model.lock()).config,
            ProducerConfig {
                period_ms: 500,
                payload_len: 8
            }
        );
    }

    #[test]
    fn test_data_subscription_drives_scheduler() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);
        let mut sink = MockNotifySink::new();
        let mut gen = PatternGenerator::new();

        let plan = match block_on(dispatcher.on_subscription_change(CharacteristicId::Data, 1)) {
            Ok(Transition::Started(plan)) => plan,
            other => panic!("Expected Started, got {:?}", other),
        };
        assert_eq!(scheduler.try_command(), Some(ProducerCommand::Start(plan)));

        block_on(async {
            assert_eq!(scheduler.tick(&model, &plan, &mut gen, &mut sink).await, TickOutcome::Sent);
            assert_eq!(
                dispatcher.on_subscription_change(CharacteristicId::Data, 0).await,
                Ok(Transition::Stopped)
            );
            assert_eq!(scheduler.tick(&model, &plan, &mut gen, &mut sink).await, TickOutcome::Stopped);
        });
        assert_eq!(sink.attempts(), 1);
    }

    #[test]
    fn test_indicate_value_does_not_enable() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        assert_eq!(
            block_on(dispatcher.on_subscription_change(CharacteristicId::Data, 2)),
            Ok(Transition::Unchanged)
        );
        assert!(!block_on(model.lock()).subscriptions.data.is_enabled());
    }

    #[test]
    fn test_notify_state_only_when_subscribed() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);
        let mut sink = MockNotifySink::new();

        block_on(async {
            assert_eq!(dispatcher.notify_state(&mut sink).await, Ok(false));
            assert_eq!(sink.attempts(), 0);

            assert_eq!(
                dispatcher.on_subscription_change(CharacteristicId::State, 1).await,
                Ok(Transition::Enabled)
            );
            assert_eq!(dispatcher.notify_state(&mut sink).await, Ok(true));
        });

        let sent = sink.get_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, CharacteristicId::State);
        assert_eq!(sent[0].1.as_slice(), STATE_JSON);
    }

    #[test]
    fn test_state_subscription_is_a_flag() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        block_on(async {
            let on = dispatcher.on_subscription_change(CharacteristicId::State, 1).await;
            assert_eq!(on, Ok(Transition::Enabled));
            let again = dispatcher.on_subscription_change(CharacteristicId::State, 1).await;
            assert_eq!(again, Ok(Transition::Unchanged));
            let off = dispatcher.on_subscription_change(CharacteristicId::State, 0).await;
            assert_eq!(off, Ok(Transition::Stopped));
        });

        // No producer plan and no signal for State
        assert!(!block_on(model.lock()).subscriptions.data.is_enabled());
        assert_eq!(scheduler.try_command(), None);
    }

    #[test]
    fn test_disconnect_clears_subscriptions() {
        let (model, scheduler) = fixture();
        let mut dispatcher = Dispatcher::new(&model, &scheduler);

        block_on(async {
            dispatcher.on_subscription_change(CharacteristicId::Data, 1).await.unwrap();
            dispatcher.on_subscription_change(CharacteristicId::State, 1).await.unwrap();
            dispatcher.on_write(CharacteristicId::State, 0, b"{", false).await.unwrap();

            dispatcher.disconnect().await;
        });

        let subs = block_on(model.lock()).subscriptions;
        assert!(!subs.data.is_enabled());
        assert!(!subs.state_notify);
        assert_eq!(scheduler.try_command(), Some(ProducerCommand::Stop));
    }

    #[test]
    fn test_read_status_reflects_counters() {
        let (model, scheduler) = fixture();
        let dispatcher = Dispatcher::new(&model, &scheduler);
        let mut out = [0u8; 128];

        block_on(async {
            let mut m = model.lock().await;
            m.stats.record_sent();
            m.stats.record_skipped(2);
        });

        let n = block_on(dispatcher.on_read(CharacteristicId::Status, 0, 128, &mut out)).unwrap();
        assert_eq!(&out[..n], br#"{"sent":1,"failed":0,"skipped":2}"#);
    }
}

//! Periodic Data producer for one connection
//!
//! Idle until the scheduler signals a start, then ticks on `embassy-time`
//! deadlines until the plan goes stale or a stop arrives. Runs alongside the
//! GATT event loop of the same connection.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{with_timeout, Duration, Instant, Timer};
use heapless::Vec;
use trouble_host::prelude::*;

use crate::ble::Server;
use crate::dispatcher::CharacteristicId;
use crate::error::GattError;
use crate::model::SharedModel;
use crate::notify::NotifySink;
use crate::scheduler::{Pacer, PatternGenerator, ProducerCommand, ProducerPlan, Scheduler, TickOutcome};

/// Notify-send over a live connection, bounded by `timeout`
pub struct ConnectionSink<'a, 'values, 'stack, 'server, P: PacketPool> {
    server: &'a Server<'values>,
    conn: &'a GattConnection<'stack, 'server, P>,
    timeout: Duration,
}

impl<'a, 'values, 'stack, 'server, P: PacketPool> ConnectionSink<'a, 'values, 'stack, 'server, P> {
    pub fn new(server: &'a Server<'values>, conn: &'a GattConnection<'stack, 'server, P>, timeout: Duration) -> Self {
        Self { server, conn, timeout }
    }
}

impl<P: PacketPool> NotifySink for ConnectionSink<'_, '_, '_, '_, P> {
    async fn notify(&mut self, characteristic: CharacteristicId, data: &[u8]) -> Result<(), GattError> {
        let sent = match characteristic {
            CharacteristicId::Data => {
                let value = Vec::from_slice(data).map_err(|_| GattError::NotifyTransientFailure)?;
                with_timeout(self.timeout, self.server.wrcd.data.notify(self.conn, &value)).await
            }
            CharacteristicId::State => {
                let value = Vec::from_slice(data).map_err(|_| GattError::NotifyTransientFailure)?;
                with_timeout(self.timeout, self.server.wrcd.state.notify(self.conn, &value)).await
            }
            _ => return Err(GattError::NotifyTransientFailure),
        };

        match sent {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                log::debug!("[ble] notify {:?} failed: {:?}", characteristic, e);
                Err(GattError::NotifyTransientFailure)
            }
            Err(_) => {
                log::debug!("[ble] notify {:?} timed out", characteristic);
                Err(GattError::NotifyTransientFailure)
            }
        }
    }
}

/// Drive the Data producer until the connection future is dropped
pub async fn producer_loop<P: PacketPool>(
    model: &SharedModel<CriticalSectionRawMutex>,
    scheduler: &Scheduler<CriticalSectionRawMutex>,
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
) {
    let mut generator = PatternGenerator::new();

    loop {
        let mut plan = match scheduler.wait_command().await {
            ProducerCommand::Start(plan) => plan,
            ProducerCommand::Stop => continue,
        };

        // Runs one plan; yields the next plan on restart, `None` on stop
        while let Some(next) = run_plan(model, scheduler, server, conn, &plan, &mut generator).await {
            plan = next;
        }
        log::info!("[producer] stopped");
    }
}

async fn run_plan<P: PacketPool>(
    model: &SharedModel<CriticalSectionRawMutex>,
    scheduler: &Scheduler<CriticalSectionRawMutex>,
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    plan: &ProducerPlan,
    generator: &mut PatternGenerator,
) -> Option<ProducerPlan> {
    let timeout = Duration::from_millis(u64::from(plan.notify_timeout_ms()));
    let mut sink = ConnectionSink::new(server, conn, timeout);
    let mut pacer = Pacer::new(plan.period_ms, Instant::now().as_millis());
    generator.restart();

    log::info!("[producer] running epoch {}", plan.epoch);

    loop {
        let deadline = Timer::at(Instant::from_millis(pacer.deadline_ms()));
        match select(deadline, scheduler.wait_command()).await {
            Either::First(()) => {
                if scheduler.tick(model, plan, generator, &mut sink).await == TickOutcome::Stopped {
                    return None;
                }
                let skipped = pacer.advance(Instant::now().as_millis());
                scheduler.record_skipped(model, skipped).await;
            }
            Either::Second(ProducerCommand::Start(next)) => return Some(next),
            Either::Second(ProducerCommand::Stop) => return None,
        }
    }
}

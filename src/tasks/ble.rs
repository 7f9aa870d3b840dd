//! BLE host task
//!
//! Advertises the WRCD service, accepts one connection at a time and runs
//! its GATT event loop next to the Data producer. Reads, writes and CCC
//! writes are routed through the [`Dispatcher`].

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Vec;
use trouble_host::prelude::*;

use super::producer::{producer_loop, ConnectionSink};
use crate::ble::Server;
use crate::config::ble::{
    ADDRESS_SUFFIX, ATT_VALUE_MAX, CONNECTIONS_MAX, DEVICE_NAME, L2CAP_CHANNELS_MAX, SERVICE_UUID_LE,
    STATE_NOTIFY_TIMEOUT_MS,
};
use crate::config::protocol::MAX_VALUE_SIZE;
use crate::dispatcher::{CharacteristicId, Dispatcher};
use crate::error::GattError;
use crate::model::SharedModel;
use crate::scheduler::Scheduler;

type Model = SharedModel<CriticalSectionRawMutex>;
type DataScheduler = Scheduler<CriticalSectionRawMutex>;

/// Main BLE task that manages the Bluetooth stack and connections
///
/// This task:
/// 1. Initialises the BLE host on the given controller
/// 2. Advertises as "WRCD" with the WRCD service UUID
/// 3. Serves GATT events of each connection from the shared model
/// 4. Runs the Data producer while the peer is subscribed
pub async fn ble_task<C: Controller>(controller: C, device_id: [u8; 3], model: &'static Model, data: &'static DataScheduler) {
    log::info!("[ble] starting as '{}'", DEVICE_NAME);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> = HostResources::new();

    let stack = trouble_host::new(controller, &mut resources).set_random_address(Address::random([
        device_id[0],
        device_id[1],
        device_id[2],
        ADDRESS_SUFFIX[0],
        ADDRESS_SUFFIX[1],
        ADDRESS_SUFFIX[2],
    ]));

    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: DEVICE_NAME,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(e) => {
            log::error!("[ble] GATT server setup failed: {:?}", e);
            return;
        }
    };

    let runner_task = runner.run();

    let peripheral_task = async {
        let mut adv_data = [0u8; 31];
        let len = match AdStructure::encode_slice(
            &[
                AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
                AdStructure::ServiceUuids128(&[SERVICE_UUID_LE]),
                AdStructure::CompleteLocalName(DEVICE_NAME.as_bytes()),
            ],
            &mut adv_data,
        ) {
            Ok(l) => l,
            Err(e) => {
                log::error!("[ble] advertising data: {:?}", e);
                return;
            }
        };

        loop {
            log::info!("[ble] advertising");
            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data[..len],
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => a,
                Err(_) => continue,
            };

            let conn = match advertiser.accept().await {
                Ok(acceptor) => match acceptor.with_attribute_server(&*server) {
                    Ok(c) => c,
                    Err(_) => continue,
                },
                Err(_) => continue,
            };
            log::info!("[ble] connected");

            let mut dispatcher = Dispatcher::new(model, data);
            select(
                gatt_events(&server, &conn, &mut dispatcher),
                producer_loop(model, data, &server, &conn),
            )
            .await;
        }
    };

    select(runner_task, peripheral_task).await;
}

/// Serve GATT events until the peer disconnects
async fn gatt_events<P: PacketPool>(
    server: &Server<'_>,
    conn: &GattConnection<'_, '_, P>,
    dispatcher: &mut Dispatcher<'_, CriticalSectionRawMutex>,
) {
    loop {
        match conn.next().await {
            GattConnectionEvent::Disconnected { reason } => {
                log::info!("[ble] disconnected: {:?}", reason);
                dispatcher.disconnect().await;
                return;
            }
            GattConnectionEvent::Gatt { event } => {
                let result = match &event {
                    GattEvent::Read(read) => on_read(server, dispatcher, read.handle()).await.map(|_| false),
                    GattEvent::Write(write) => on_write(server, dispatcher, write.handle(), write.data()).await,
                    _ => Ok(false),
                };

                let state_written = matches!(result, Ok(true));
                let reply = match result {
                    Ok(_) => event.accept(),
                    Err(e) => event.reject(att_error(e)),
                };
                match reply {
                    Ok(reply) => reply.send().await,
                    Err(e) => log::warn!("[ble] error sending response: {:?}", e),
                }

                if state_written {
                    let mut sink = ConnectionSink::new(server, conn, embassy_time::Duration::from_millis(STATE_NOTIFY_TIMEOUT_MS));
                    if let Err(e) = dispatcher.notify_state(&mut sink).await {
                        log::warn!("[ble] state notify failed: {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Refresh the stored value from the model so the server answers the read
async fn on_read(
    server: &Server<'_>,
    dispatcher: &Dispatcher<'_, CriticalSectionRawMutex>,
    handle: u16,
) -> Result<(), GattError> {
    let Some(id) = characteristic_for(server, handle) else {
        return Ok(());
    };

    let mut value = [0u8; MAX_VALUE_SIZE];
    let len = dispatcher.on_read(id, 0, ATT_VALUE_MAX, &mut value).await?;
    store(server, id, &value[..len])
}

/// Apply a value or CCC write; returns true when State changed
async fn on_write(
    server: &Server<'_>,
    dispatcher: &mut Dispatcher<'_, CriticalSectionRawMutex>,
    handle: u16,
    data: &[u8],
) -> Result<bool, GattError> {
    if let Some(id) = subscription_for(server, handle) {
        let ccc = data.get(..2).ok_or(GattError::Truncated)?;
        dispatcher.on_subscription_change(id, u16::from_le_bytes([ccc[0], ccc[1]])).await?;
        return Ok(false);
    }

    let Some(id) = characteristic_for(server, handle) else {
        return Ok(false);
    };
    dispatcher.on_write(id, 0, data, true).await?;
    Ok(id == CharacteristicId::State)
}

fn characteristic_for(server: &Server<'_>, handle: u16) -> Option<CharacteristicId> {
    let wrcd = &server.wrcd;
    match handle {
        h if h == wrcd.state.handle => Some(CharacteristicId::State),
        h if h == wrcd.spec.handle => Some(CharacteristicId::Spec),
        h if h == wrcd.status.handle => Some(CharacteristicId::Status),
        h if h == wrcd.data.handle => Some(CharacteristicId::Data),
        h if h == wrcd.calibration.handle => Some(CharacteristicId::Calibration),
        h if h == server.simulator.config.handle => Some(CharacteristicId::Config),
        _ => None,
    }
}

fn subscription_for(server: &Server<'_>, handle: u16) -> Option<CharacteristicId> {
    match Some(handle) {
        h if h == server.wrcd.state.cccd_handle => Some(CharacteristicId::State),
        h if h == server.wrcd.data.cccd_handle => Some(CharacteristicId::Data),
        _ => None,
    }
}

fn store(server: &Server<'_>, id: CharacteristicId, data: &[u8]) -> Result<(), GattError> {
    match id {
        CharacteristicId::State => set(server, &server.wrcd.state, data),
        CharacteristicId::Spec => set(server, &server.wrcd.spec, data),
        CharacteristicId::Status => set(server, &server.wrcd.status, data),
        CharacteristicId::Calibration => set(server, &server.wrcd.calibration, data),
        CharacteristicId::Config => set(server, &server.simulator.config, data),
        CharacteristicId::Data => Err(GattError::ReadNotPermitted),
    }
}

fn set<const N: usize>(server: &Server<'_>, characteristic: &Characteristic<Vec<u8, N>>, data: &[u8]) -> Result<(), GattError> {
    let value = Vec::from_slice(data).map_err(|_| GattError::EncodeTooLarge)?;
    server.set(characteristic, &value).map_err(|_| GattError::BufferTooSmall)
}

fn att_error(error: GattError) -> AttErrorCode {
    match error {
        GattError::ReadNotPermitted => AttErrorCode::READ_NOT_PERMITTED,
        GattError::WriteNotPermitted => AttErrorCode::WRITE_NOT_PERMITTED,
        GattError::InvalidOffset => AttErrorCode::INVALID_OFFSET,
        GattError::Truncated => AttErrorCode::INVALID_ATTRIBUTE_VALUE_LENGTH,
        GattError::NotifyTransientFailure => AttErrorCode::UNLIKELY_ERROR,
        GattError::BufferTooSmall | GattError::EncodeTooLarge => AttErrorCode::INSUFFICIENT_RESOURCES,
        GattError::OutOfRange | GattError::ParseError => AttErrorCode::VALUE_NOT_ALLOWED,
    }
}

//! GATT services of the WRCD peripheral
//!
//! - WRCD service: 00000100-f5bf-58d5-9d17-172177d1316a
//! - Simulator service: ffffff00-f5bf-58d5-9d17-172177d1316a
//!
//! The stored values are refreshed from the entity model before every read,
//! so they only ever mirror what the dispatcher encodes.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Vec;
use trouble_host::prelude::*;

use crate::config::calibration::CAPACITY as CALIBRATION_LEN;
use crate::codec::config::CONFIG_LEN;
use crate::config::ble::ATT_VALUE_MAX;
use crate::config::json::STATUS_BUFFER_SIZE;
use crate::scheduler::MAX_PAYLOAD;

/// Sensor description, state and data stream
#[gatt_service(uuid = "00000100-f5bf-58d5-9d17-172177d1316a")]
pub struct WrcdService {
    /// JSON state object
    #[characteristic(uuid = "00000101-f5bf-58d5-9d17-172177d1316a", read, write, notify)]
    pub state: Vec<u8, ATT_VALUE_MAX>,

    /// Binary channel/range description
    #[characteristic(uuid = "00000102-f5bf-58d5-9d17-172177d1316a", read, write)]
    pub spec: Vec<u8, ATT_VALUE_MAX>,

    /// JSON notification counters
    #[characteristic(uuid = "00000103-f5bf-58d5-9d17-172177d1316a", read)]
    pub status: Vec<u8, STATUS_BUFFER_SIZE>,

    /// Periodic payload stream
    #[characteristic(uuid = "00000104-f5bf-58d5-9d17-172177d1316a", notify)]
    pub data: Vec<u8, MAX_PAYLOAD>,

    /// Opaque calibration blob
    #[characteristic(uuid = "00000105-f5bf-58d5-9d17-172177d1316a", read, write)]
    pub calibration: Vec<u8, CALIBRATION_LEN>,
}

/// Producer settings
#[gatt_service(uuid = "ffffff00-f5bf-58d5-9d17-172177d1316a")]
pub struct SimulatorService {
    /// Sampling interval and payload length
    #[characteristic(uuid = "ffffff11-f5bf-58d5-9d17-172177d1316a", read, write)]
    pub config: Vec<u8, CONFIG_LEN>,
}

/// GATT server with both services
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
pub struct Server {
    pub wrcd: WrcdService,
    pub simulator: SimulatorService,
}

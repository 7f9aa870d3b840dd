#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use static_cell::StaticCell;

use wrcd_firmware::dispatcher::CharacteristicId;
use wrcd_firmware::model::SharedModel;
use wrcd_firmware::scheduler::Scheduler;
use wrcd_firmware::tasks::ble_task;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// The entity model, shared by the GATT callbacks and the producer
static MODEL: StaticCell<SharedModel<CriticalSectionRawMutex>> = StaticCell::new();

/// Scheduler of the Data characteristic
static DATA_SCHEDULER: Scheduler<CriticalSectionRawMutex> = Scheduler::new(CharacteristicId::Data);

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

#[esp_hal::main]
fn main() -> ! {
    esp_println::logger::init_logger_from_env();

    // Heap for BLE and the JSON codec
    esp_alloc::heap_allocator!(size: 64 * 1024);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Read unique device ID from eFuse MAC address (last 3 bytes)
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let device_id: [u8; 3] = [mac[3], mac[4], mac[5]];

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller = RADIO_CONTROLLER.init(
        esp_radio::init().expect("Failed to initialize esp-radio")
    );

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    ).expect("Failed to initialize BLE connector");

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    let model = MODEL.init(SharedModel::default());

    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, controller, device_id, model));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    ble_controller: BleController,
    device_id: [u8; 3],
    model: &'static SharedModel<CriticalSectionRawMutex>,
) {
    log::info!("WRCD firmware {}", env!("CARGO_PKG_VERSION"));
    spawner.must_spawn(ble_host_task(ble_controller, device_id, model));
}

/// Task that manages BLE connectivity and the Data producer
#[embassy_executor::task]
async fn ble_host_task(
    controller: BleController,
    device_id: [u8; 3],
    model: &'static SharedModel<CriticalSectionRawMutex>,
) {
    ble_task(controller, device_id, model, &DATA_SCHEDULER).await;
}

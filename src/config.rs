//! Compile-time configuration for the WRCD peripheral

/// BLE identity and host resources
pub mod ble {
    /// Advertised complete local name
    pub const DEVICE_NAME: &str = "WRCD";

    /// WRCD primary service UUID (little-endian byte order for advertising)
    pub const SERVICE_UUID_LE: [u8; 16] = [
        0x6a, 0x31, 0xd1, 0x77, 0x21, 0x17, 0x17, 0x9d, 0xd5, 0x58, 0xbf, 0xf5, 0x00, 0x01, 0x00, 0x00,
    ];

    /// Random static address suffix, the first three bytes come from the eFuse MAC
    pub const ADDRESS_SUFFIX: [u8; 3] = [0x57, 0x52, 0xC3];

    /// Largest attribute value the GATT server stores
    pub const ATT_VALUE_MAX: usize = 512;

    /// Bound on a State notification
    pub const STATE_NOTIFY_TIMEOUT_MS: u64 = 500;

    pub const CONNECTIONS_MAX: usize = 1;
    /// Signal + ATT
    pub const L2CAP_CHANNELS_MAX: usize = 2;
}

/// Sensor description limits and defaults
pub mod sensor {
    /// Number of channels, fixed for the device
    pub const CHANNEL_COUNT: usize = 4;

    /// Maximum number of ranges per channel
    pub const MAX_RANGES: usize = 4;

    /// Width of a name/unit field including the terminator
    pub const NAME_FIELD_LEN: usize = 8;

    pub const DEFAULT_NAME: &str = "WRCD";
    pub const DEFAULT_SERIAL: u32 = 1_000_001;

    /// ADC full-scale of the 16-bit signed converter
    pub const DEFAULT_ADC_FULL_SCALE: u16 = 32_767;

    /// Force channel physical ranges in N
    pub const FORCE_RANGES: [u32; MAX_RANGES] = [500, 1_000, 2_000, 5_000];

    /// Moment channel physical ranges in Nm
    pub const MOMENT_RANGES: [u32; MAX_RANGES] = [50, 100, 200, 500];
}

/// JSON codec buffers
pub mod json {
    /// Capacity of the encoded State value
    pub const STATE_BUFFER_SIZE: usize = 1024;

    /// Capacity of the encoded Status value
    pub const STATUS_BUFFER_SIZE: usize = 128;
}

/// Periodic producer defaults and bounds
pub mod producer {
    pub const DEFAULT_PERIOD_MS: u16 = 100;
    pub const DEFAULT_PAYLOAD_LEN: u8 = 20;

    /// Shortest accepted notification period
    pub const MIN_PERIOD_MS: u16 = 10;

    /// Largest payload that fits one notification at the maximum ATT MTU (247 - 3)
    pub const MAX_PAYLOAD_LEN: u8 = 244;

    /// Upper bound on one Data notify-send
    ///
    /// The tick holds the model lock while sending, and GATT requests wait
    /// on that lock. Must stay well under the 30 s ATT transaction timeout.
    pub const MAX_NOTIFY_TIMEOUT_MS: u32 = 500;
}

/// Calibration pass-through storage
pub mod calibration {
    pub const CAPACITY: usize = 64;
}

/// GATT protocol buffers
pub mod protocol {
    /// Capacity of the prepare-write assembler per characteristic
    pub const PREPARE_BUFFER_SIZE: usize = 1024;

    /// Largest value any characteristic encodes, used for per-call read buffers
    pub const MAX_VALUE_SIZE: usize = 1024;

    /// CCC value that enables notifications
    pub const CCC_NOTIFY: u16 = 0x0001;
}

//! Characteristic table
//!
//! Identity and capabilities of every characteristic the peripheral exposes.
//! UUIDs live with the GATT server definition in `ble::service`.

/// Characteristics known to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacteristicId {
    /// Free-form JSON state object
    State,
    /// Binary multi-channel sensor description
    Spec,
    /// JSON notification counters
    Status,
    /// Periodically notified payload stream
    Data,
    /// Opaque calibration blob
    Calibration,
    /// Producer period and payload length
    Config,
}

/// What a peer may do with a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl Properties {
    const fn new(read: bool, write: bool, notify: bool) -> Self {
        Self { read, write, notify }
    }
}

impl CharacteristicId {
    pub const ALL: [CharacteristicId; 6] = [
        CharacteristicId::State,
        CharacteristicId::Spec,
        CharacteristicId::Status,
        CharacteristicId::Data,
        CharacteristicId::Calibration,
        CharacteristicId::Config,
    ];

    pub const fn properties(self) -> Properties {
        match self {
            CharacteristicId::State => Properties::new(true, true, true),
            CharacteristicId::Spec => Properties::new(true, true, false),
            CharacteristicId::Status => Properties::new(true, false, false),
            CharacteristicId::Data => Properties::new(false, false, true),
            CharacteristicId::Calibration => Properties::new(true, true, false),
            CharacteristicId::Config => Properties::new(true, true, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_is_notify_only() {
        let props = CharacteristicId::Data.properties();
        assert!(props.notify);
        assert!(!props.read);
        assert!(!props.write);
    }

    #[test]
    fn test_status_is_read_only() {
        assert_eq!(CharacteristicId::Status.properties(), Properties::new(true, false, false));
    }

    #[test]
    fn test_notifiable_set() {
        let notifiable: heapless::Vec<CharacteristicId, 6> =
            CharacteristicId::ALL.into_iter().filter(|id| id.properties().notify).collect();
        assert_eq!(notifiable.as_slice(), &[CharacteristicId::State, CharacteristicId::Data]);
    }
}

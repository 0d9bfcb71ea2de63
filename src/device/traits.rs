//! The device control boundary.
//!
//! `DeviceConnector` opens channels, `DeviceControl` is one open channel.
//! Real controllers use [`super::SerialDoorConnector`]; tests use
//! [`super::MockConnector`].

use super::error::DeviceResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Door configuration as reported by the controller, keyed by door name.
///
/// The per-door value is opaque to the host. A `BTreeMap` keeps the keys in
/// lexicographic order, which is the order doors are shown in.
pub type DoorConfigMap = BTreeMap<String, serde_json::Value>;

/// Requested or reported position of one door.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Open,
    Close,
}

impl DoorState {
    pub fn from_open(open: bool) -> Self {
        if open {
            Self::Open
        } else {
            Self::Close
        }
    }

    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Close => f.write_str("close"),
        }
    }
}

/// Door name to state.
pub type DoorStates = BTreeMap<String, DoorState>;

/// One open channel to a door controller.
pub trait DeviceControl: Send + fmt::Debug {
    /// Port this channel was opened on.
    fn port_name(&self) -> &str;

    /// Configuration problems the controller found in its stored config.
    ///
    /// An empty list means the stored configuration is valid.
    fn get_config_errors(&mut self) -> DeviceResult<Vec<String>>;

    /// The controller's door configuration.
    ///
    /// Only meaningful after `get_config_errors` returned an empty list.
    fn get_config(&mut self) -> DeviceResult<DoorConfigMap>;

    /// Current state of every configured door.
    fn get_doors(&mut self) -> DeviceResult<DoorStates>;

    /// Command the given doors; doors not named are left alone.
    fn set_doors(&mut self, doors: &DoorStates) -> DeviceResult<()>;

    /// Release the channel. Must not fail on an unresponsive controller
    /// beyond reporting it.
    fn close(&mut self) -> DeviceResult<()>;
}

/// Opens channels to controllers by port name.
pub trait DeviceConnector: Send {
    /// Open `port_name` and confirm a controller answers on it.
    fn connect(&self, port_name: &str) -> DeviceResult<Box<dyn DeviceControl>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_door_state_wire_names() {
        assert_eq!(serde_json::to_string(&DoorState::Open).unwrap(), "\"open\"");
        assert_eq!(serde_json::to_string(&DoorState::Close).unwrap(), "\"close\"");
        assert_eq!(
            serde_json::from_str::<DoorState>("\"close\"").unwrap(),
            DoorState::Close
        );
    }

    #[test]
    fn test_door_state_from_bool() {
        assert_eq!(DoorState::from_open(true), DoorState::Open);
        assert_eq!(DoorState::from_open(false), DoorState::Close);
        assert!(DoorState::Open.is_open());
        assert_eq!(DoorState::Close.to_string(), "close");
    }

    #[test]
    fn test_config_map_orders_door_names() {
        let config: DoorConfigMap =
            serde_json::from_str(r#"{"north": {"pin": 2}, "east": {"pin": 4}}"#).unwrap();
        let names: Vec<_> = config.keys().cloned().collect();
        assert_eq!(names, vec!["east", "north"]);
    }
}

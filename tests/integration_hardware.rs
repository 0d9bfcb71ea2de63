//! Tests against a real door controller.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! export TEST_PORT=COM3                  # or /dev/ttyACM0 on Linux
//! export TEST_BAUD=115200                # optional, default: 115200
//!
//! cargo test --features hardware-tests -- --ignored
//! ```
//!
//! The controller must answer `ping` and hold a valid configuration with at
//! least one door. Doors are moved and then put back.

#![cfg(feature = "hardware-tests")]

use serial_test::serial;
use servodoor::device::{DeviceSession, DoorStates, SerialDoorConnector};
use servodoor::directory::{PortProvider, SystemPortDirectory};
use servodoor::pipeline::{read_device_config, ConfigRead};
use servodoor::port::PortConfiguration;
use std::env;
use std::time::Duration;

struct TestPort {
    name: String,
    baud_rate: u32,
}

impl TestPort {
    fn from_env() -> Option<Self> {
        let name = env::var("TEST_PORT").ok()?;
        let baud_rate = env::var("TEST_BAUD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(115_200);
        Some(Self { name, baud_rate })
    }

    fn connector(&self) -> SerialDoorConnector {
        let config = PortConfiguration {
            baud_rate: self.baud_rate,
            timeout: Duration::from_millis(100),
        };
        SerialDoorConnector::new(config, Duration::from_secs(2), true)
    }
}

fn skip_without_hardware() -> Option<TestPort> {
    let port = TestPort::from_env();
    if port.is_none() {
        println!("TEST_PORT not set, skipping");
    }
    port
}

#[test]
#[ignore]
#[serial]
fn test_port_is_listed() {
    let Some(port) = skip_without_hardware() else {
        return;
    };

    let ports = SystemPortDirectory::new(None).list_ports();
    assert!(
        ports.iter().any(|p| p.name == port.name),
        "{} not in {:?}",
        port.name,
        ports
    );
}

#[test]
#[ignore]
#[serial]
fn test_read_config_and_doors() {
    let Some(port) = skip_without_hardware() else {
        return;
    };
    let mut session = DeviceSession::new();

    session.connect(&port.connector(), &port.name).unwrap();
    let ConfigRead::Loaded(config) = read_device_config(&mut session) else {
        panic!("controller on {} has no valid configuration", port.name);
    };
    let doors = session.get_doors().unwrap();

    assert!(!config.is_empty());
    for name in config.keys() {
        assert!(doors.contains_key(name), "no state reported for {name}");
    }
    assert!(session.disconnect().is_some());
}

#[test]
#[ignore]
#[serial]
fn test_toggle_and_restore_first_door() {
    let Some(port) = skip_without_hardware() else {
        return;
    };
    let mut session = DeviceSession::new();
    session.connect(&port.connector(), &port.name).unwrap();

    let before = session.get_doors().unwrap();
    let Some((name, state)) = before.iter().next().map(|(n, s)| (n.clone(), *s)) else {
        panic!("controller on {} reports no doors", port.name);
    };

    let mut flipped = DoorStates::new();
    flipped.insert(name.clone(), servodoor::DoorState::from_open(!state.is_open()));
    session.set_doors(&flipped).unwrap();
    assert_eq!(session.get_doors().unwrap()[&name], flipped[&name]);

    let mut restore = DoorStates::new();
    restore.insert(name.clone(), state);
    session.set_doors(&restore).unwrap();
    session.disconnect();
}

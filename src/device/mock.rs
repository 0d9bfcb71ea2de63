//! In-memory door controller for tests.
//!
//! `MockConnector` hands out `MockDoorDevice` channels that share one state
//! with the connector, so a test keeps the connector and inspects every call
//! made through any channel it opened, in order.

use super::error::{DeviceError, DeviceResult};
use super::traits::{DeviceConnector, DeviceControl, DoorConfigMap, DoorState, DoorStates};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

/// One call that reached the mock controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Connect(String),
    GetConfigErrors,
    GetConfig,
    GetDoors,
    SetDoors(DoorStates),
    Close,
}

#[derive(Debug, Default)]
struct MockDeviceState {
    calls: Vec<DeviceCall>,
    config: DoorConfigMap,
    doors: DoorStates,
    config_errors: Vec<String>,
    fail_connect: bool,
    fail_close: bool,
    fail_config_errors: bool,
    fail_config: bool,
    fail_doors: bool,
    fail_set_doors: bool,
    /// Set only after `get_config_errors` answered with an empty list.
    config_unlocked: bool,
    ordering_violations: usize,
}

/// Connector producing in-memory controllers.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller configured with the given doors, each with an empty config object.
    pub fn with_doors(doors: &[(&str, DoorState)]) -> Self {
        let connector = Self::new();
        {
            let mut state = connector.state.lock();
            for (name, door_state) in doors {
                state.config.insert(name.to_string(), json!({}));
                state.doors.insert(name.to_string(), *door_state);
            }
        }
        connector
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of `get_config` calls not preceded by a clean `get_config_errors`.
    pub fn ordering_violations(&self) -> usize {
        self.state.lock().ordering_violations
    }

    /// Current door states as the controller sees them.
    pub fn doors(&self) -> DoorStates {
        self.state.lock().doors.clone()
    }

    pub fn set_config(&self, config: DoorConfigMap) {
        self.state.lock().config = config;
    }

    pub fn set_config_errors(&self, errors: Vec<String>) {
        self.state.lock().config_errors = errors;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn fail_close(&self, fail: bool) {
        self.state.lock().fail_close = fail;
    }

    pub fn fail_config_errors(&self, fail: bool) {
        self.state.lock().fail_config_errors = fail;
    }

    pub fn fail_config(&self, fail: bool) {
        self.state.lock().fail_config = fail;
    }

    pub fn fail_doors(&self, fail: bool) {
        self.state.lock().fail_doors = fail;
    }

    pub fn fail_set_doors(&self, fail: bool) {
        self.state.lock().fail_set_doors = fail;
    }
}

impl DeviceConnector for MockConnector {
    fn connect(&self, port_name: &str) -> DeviceResult<Box<dyn DeviceControl>> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::Connect(port_name.to_string()));
        if state.fail_connect {
            return Err(DeviceError::Handshake {
                port: port_name.to_string(),
                reason: "mock controller is offline".to_string(),
            });
        }
        state.config_unlocked = false;
        Ok(Box::new(MockDoorDevice {
            port_name: port_name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// One channel opened by [`MockConnector`].
#[derive(Debug)]
pub struct MockDoorDevice {
    port_name: String,
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDoorDevice {
    fn rejected(command: &str) -> DeviceError {
        DeviceError::Rejected {
            command: command.to_string(),
        }
    }
}

impl DeviceControl for MockDoorDevice {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn get_config_errors(&mut self) -> DeviceResult<Vec<String>> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::GetConfigErrors);
        if state.fail_config_errors {
            state.config_unlocked = false;
            return Err(Self::rejected("get_config_errors"));
        }
        state.config_unlocked = state.config_errors.is_empty();
        Ok(state.config_errors.clone())
    }

    fn get_config(&mut self) -> DeviceResult<DoorConfigMap> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::GetConfig);
        if !state.config_unlocked {
            state.ordering_violations += 1;
            return Err(Self::rejected("get_config"));
        }
        if state.fail_config {
            return Err(Self::rejected("get_config"));
        }
        Ok(state.config.clone())
    }

    fn get_doors(&mut self) -> DeviceResult<DoorStates> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::GetDoors);
        if state.fail_doors {
            return Err(Self::rejected("get_doors"));
        }
        Ok(state.doors.clone())
    }

    fn set_doors(&mut self, doors: &DoorStates) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::SetDoors(doors.clone()));
        if state.fail_set_doors {
            return Err(Self::rejected("set_doors"));
        }
        for (name, door_state) in doors {
            state.doors.insert(name.clone(), *door_state);
        }
        Ok(())
    }

    fn close(&mut self) -> DeviceResult<()> {
        let mut state = self.state.lock();
        state.calls.push(DeviceCall::Close);
        state.config_unlocked = false;
        if state.fail_close {
            return Err(DeviceError::Timeout {
                command: "close".to_string(),
                timeout_ms: 0,
            });
        }
        Ok(())
    }
}

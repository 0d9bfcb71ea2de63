//! Line-delimited JSON protocol spoken by servo door controllers.
//!
//! ```text
//! host → controller:  {"cmd":"set_doors","doors":{"east":"close"}}\n
//! controller → host:  {"ok":true}\n
//! ```
//!
//! Every reply carries `ok`; query replies add `config_errors`, `config` or
//! `doors`. Blank lines between replies are skipped.

use super::error::{DeviceError, DeviceResult};
use super::traits::{DeviceConnector, DeviceControl, DoorConfigMap, DoorStates};
use crate::config::Config;
use crate::port::{PortConfiguration, SerialPortAdapter, SyncSerialPort};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest reply line accepted before the reply is treated as garbage.
const MAX_LINE_LEN: usize = 64 * 1024;

/// A door controller reached through a serial transport.
#[derive(Debug)]
pub struct SerialDoorDevice {
    port: Option<Box<dyn SerialPortAdapter>>,
    port_name: String,
    response_timeout: Duration,
}

impl SerialDoorDevice {
    pub fn new(port: Box<dyn SerialPortAdapter>, response_timeout: Duration) -> Self {
        let port_name = port.name().to_string();
        Self {
            port: Some(port),
            port_name,
            response_timeout,
        }
    }

    /// Ask the controller to prove it is alive.
    pub fn handshake(&mut self) -> DeviceResult<()> {
        self.request("ping", json!({})).map(|_| ())
    }

    fn request(&mut self, command: &str, params: Value) -> DeviceResult<Map<String, Value>> {
        let timeout = self.response_timeout;
        let port = self.port.as_mut().ok_or(DeviceError::NotConnected)?;
        let port_name = port.name().to_string();

        let mut request = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        request.insert("cmd".to_string(), Value::String(command.to_string()));
        let mut line = Value::Object(request).to_string();
        line.push('\n');

        if let Err(e) = port.clear_input() {
            debug!(port = %port_name, error = %e, "could not clear stale input");
        }
        debug!(port = %port_name, command, bytes = line.len(), "serial write");
        port.write_bytes(line.as_bytes())
            .map_err(|e| DeviceError::port(&port_name, e))?;

        let reply = read_reply_line(&mut **port, command, timeout)?;
        debug!(port = %port_name, command, bytes = reply.len(), "serial read");

        let value: Value =
            serde_json::from_str(&reply).map_err(|e| DeviceError::malformed(command, e))?;
        let Value::Object(map) = value else {
            return Err(DeviceError::malformed(command, "reply is not an object"));
        };
        match map.get("ok").and_then(Value::as_bool) {
            Some(true) => Ok(map),
            Some(false) => Err(DeviceError::Rejected {
                command: command.to_string(),
            }),
            None => Err(DeviceError::malformed(command, "reply has no 'ok' flag")),
        }
    }

    fn query<T: DeserializeOwned>(&mut self, command: &str, key: &str) -> DeviceResult<T> {
        let mut reply = self.request(command, json!({}))?;
        let field = reply
            .remove(key)
            .ok_or_else(|| DeviceError::malformed(command, format!("reply has no '{key}'")))?;
        serde_json::from_value(field).map_err(|e| DeviceError::malformed(command, e))
    }
}

/// Read bytes until a non-empty line is complete or `timeout` passes.
fn read_reply_line(
    port: &mut dyn SerialPortAdapter,
    command: &str,
    timeout: Duration,
) -> DeviceResult<String> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match port.read_bytes(&mut byte) {
            Ok(0) => {}
            Ok(_) if byte[0] == b'\n' => {
                let text = String::from_utf8_lossy(&line).trim().to_string();
                if !text.is_empty() {
                    return Ok(text);
                }
                line.clear();
            }
            Ok(_) => {
                line.push(byte[0]);
                if line.len() > MAX_LINE_LEN {
                    return Err(DeviceError::malformed(command, "reply line too long"));
                }
            }
            Err(e) if e.is_idle() => {}
            Err(e) => return Err(DeviceError::port(port.name(), e)),
        }

        if Instant::now() >= deadline {
            return Err(DeviceError::Timeout {
                command: command.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
    }
}

impl DeviceControl for SerialDoorDevice {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn get_config_errors(&mut self) -> DeviceResult<Vec<String>> {
        self.query("get_config_errors", "config_errors")
    }

    fn get_config(&mut self) -> DeviceResult<DoorConfigMap> {
        self.query("get_config", "config")
    }

    fn get_doors(&mut self) -> DeviceResult<DoorStates> {
        self.query("get_doors", "doors")
    }

    fn set_doors(&mut self, doors: &DoorStates) -> DeviceResult<()> {
        self.request("set_doors", json!({ "doors": doors }))
            .map(|_| ())
    }

    fn close(&mut self) -> DeviceResult<()> {
        // Dropping the adapter releases the OS handle.
        if self.port.take().is_some() {
            info!(port = %self.port_name, "serial port released");
        }
        Ok(())
    }
}

/// Opens real controllers on serial ports.
#[derive(Debug, Clone)]
pub struct SerialDoorConnector {
    port_config: PortConfiguration,
    response_timeout: Duration,
    handshake: bool,
}

impl SerialDoorConnector {
    pub fn new(port_config: PortConfiguration, response_timeout: Duration, handshake: bool) -> Self {
        Self {
            port_config,
            response_timeout,
            handshake,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PortConfiguration::from(&config.serial),
            config.device.response_timeout(),
            config.device.handshake,
        )
    }
}

impl DeviceConnector for SerialDoorConnector {
    fn connect(&self, port_name: &str) -> DeviceResult<Box<dyn DeviceControl>> {
        let port = SyncSerialPort::open(port_name, &self.port_config)
            .map_err(|e| DeviceError::port(port_name, e))?;
        let mut device = SerialDoorDevice::new(Box::new(port), self.response_timeout);

        if self.handshake {
            if let Err(e) = device.handshake() {
                warn!(port = port_name, error = %e, "handshake failed");
                let _ = device.close();
                return Err(DeviceError::Handshake {
                    port: port_name.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        info!(port = port_name, "controller connected");
        Ok(Box::new(device))
    }
}

//! Serial port discovery.
//!
//! The directory is stateless: every call re-queries the host and returns a
//! fresh snapshot. Nothing here touches the device session.

use crate::config::SerialConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serialport::SerialPortType;
use std::sync::Arc;
use tracing::{debug, warn};

/// One candidate serial port as seen during a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    /// Device path or name, unique within a snapshot
    pub name: String,
    pub manufacturer: String,
    pub description: String,
    /// Hardware-id tokens such as `VID:PID=2E8A:0005` and `SER=E6614C31`
    pub hwid: Vec<String>,
}

impl PortDescriptor {
    /// Descriptor for a port the directory knows nothing else about.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: "n/a".to_string(),
            description: "n/a".to_string(),
            hwid: Vec::new(),
        }
    }

    /// Multi-line block shown next to the port list: name, manufacturer,
    /// description, then one hardware-id token per line.
    pub fn info_text(&self) -> String {
        let mut lines = vec![
            self.name.clone(),
            self.manufacturer.clone(),
            self.description.clone(),
        ];
        lines.extend(self.hwid.iter().cloned());
        lines.join("\n")
    }

    fn from_serialport(info: serialport::SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => {
                let mut hwid = vec![format!("VID:PID={:04X}:{:04X}", usb.vid, usb.pid)];
                if let Some(serial) = usb.serial_number {
                    hwid.push(format!("SER={serial}"));
                }
                Self {
                    name: info.port_name,
                    manufacturer: usb.manufacturer.unwrap_or_else(|| "n/a".to_string()),
                    description: usb.product.unwrap_or_else(|| "n/a".to_string()),
                    hwid,
                }
            }
            SerialPortType::PciPort => Self {
                hwid: vec!["PCI".to_string()],
                ..Self::bare(info.port_name)
            },
            SerialPortType::BluetoothPort => Self {
                hwid: vec!["BLUETOOTH".to_string()],
                ..Self::bare(info.port_name)
            },
            SerialPortType::Unknown => Self::bare(info.port_name),
        }
    }
}

/// Source of port snapshots.
pub trait PortProvider: Send {
    /// List the ports an operator could pick right now.
    ///
    /// Never fails: an enumeration problem is reported as an empty list.
    fn list_ports(&self) -> Vec<PortDescriptor>;
}

/// Port directory backed by the operating system's serial port list.
#[derive(Debug, Clone, Default)]
pub struct SystemPortDirectory {
    filter: Option<String>,
}

impl SystemPortDirectory {
    /// Create a directory that only returns ports whose name contains `filter`.
    pub fn new(filter: Option<String>) -> Self {
        Self { filter }
    }

    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(config.port_filter.clone())
    }
}

impl PortProvider for SystemPortDirectory {
    fn list_ports(&self) -> Vec<PortDescriptor> {
        let ports = match serialport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                warn!(error = %e, "serial port enumeration failed");
                return Vec::new();
            }
        };

        let descriptors: Vec<_> = ports
            .into_iter()
            .map(PortDescriptor::from_serialport)
            .collect();
        let descriptors = apply_filter(descriptors, self.filter.as_deref());
        debug!(count = descriptors.len(), "ports listed");
        descriptors
    }
}

#[derive(Debug, Default)]
struct FixedPorts {
    ports: Vec<PortDescriptor>,
    polls: usize,
}

/// Port directory serving a snapshot set by the caller, for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct FixedPortDirectory {
    inner: Arc<Mutex<FixedPorts>>,
}

impl FixedPortDirectory {
    pub fn new(ports: Vec<PortDescriptor>) -> Self {
        let directory = Self::default();
        directory.set_ports(ports);
        directory
    }

    pub fn set_ports(&self, ports: Vec<PortDescriptor>) {
        self.inner.lock().ports = ports;
    }

    /// Number of `list_ports` calls so far.
    pub fn polls(&self) -> usize {
        self.inner.lock().polls
    }
}

impl PortProvider for FixedPortDirectory {
    fn list_ports(&self) -> Vec<PortDescriptor> {
        let mut inner = self.inner.lock();
        inner.polls += 1;
        inner.ports.clone()
    }
}

/// Keep only ports whose name contains `filter`, preserving order.
pub fn apply_filter(ports: Vec<PortDescriptor>, filter: Option<&str>) -> Vec<PortDescriptor> {
    match filter {
        Some(needle) if !needle.is_empty() => ports
            .into_iter()
            .filter(|p| p.name.contains(needle))
            .collect(),
        _ => ports,
    }
}

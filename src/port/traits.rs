//! Core traits for serial port abstraction.
//!
//! Defines the `SerialPortAdapter` trait that allows both real serial ports
//! and mock implementations to carry the door controller protocol.

use super::error::PortError;
use crate::config::SerialConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Line settings used when opening a controller port.
///
/// Door controllers enumerate as USB CDC devices, so only the baud rate and
/// the per-read timeout matter; framing is always 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Timeout for a single read or write call.
    pub timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            timeout: Duration::from_millis(100),
        }
    }
}

impl From<&SerialConfig> for PortConfiguration {
    fn from(cfg: &SerialConfig) -> Self {
        Self {
            baud_rate: cfg.baud_rate,
            timeout: cfg.read_timeout(),
        }
    }
}

/// Trait for serial port I/O operations.
///
/// Abstracts over synchronous serial port operations, allowing both
/// real hardware ports and mock implementations for testing.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Returns the number of bytes actually read. A read that times out
    /// without data is reported as `PortError::Timeout` or an I/O error of
    /// kind `TimedOut`/`WouldBlock`; callers treat those as "nothing yet".
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Discard unread input so a new request starts from a clean line.
    fn clear_input(&mut self) -> Result<(), PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = PortConfiguration::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_from_serial_config() {
        let serial = SerialConfig {
            baud_rate: 9600,
            read_timeout_ms: 250,
            ..SerialConfig::default()
        };
        let config = PortConfiguration::from(&serial);
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }
}

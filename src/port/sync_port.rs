//! Blocking serial port backed by the `serialport` crate.

use super::error::PortError;
use super::traits::{PortConfiguration, SerialPortAdapter};
use std::io::{Read, Write};

/// An open OS serial port, 8N1 without flow control.
pub struct SyncSerialPort {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SyncSerialPort {
    /// ```no_run
    /// use servodoor::port::{PortConfiguration, SyncSerialPort};
    ///
    /// let config = PortConfiguration { baud_rate: 115_200, ..Default::default() };
    /// let _port = SyncSerialPort::open("/dev/ttyACM0", &config)?;
    /// # Ok::<(), servodoor::port::PortError>(())
    /// ```
    pub fn open(port_name: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let port = serialport::new(port_name, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
                serialport::ErrorKind::InvalidInput => PortError::settings(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        Ok(Self {
            port,
            name: port_name.to_string(),
        })
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let written = self.port.write(data)?;
        self.port.flush()?;
        Ok(written)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.port.read(buffer).map_err(PortError::Io)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_input(&mut self) -> Result<(), PortError> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(PortError::Serial)
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

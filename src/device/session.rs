//! The one device session the application may hold.
//!
//! The channel and the port name it was opened on travel together in a
//! [`Link`], so a session is either fully connected or fully disconnected.

use super::error::{DeviceError, DeviceResult};
use super::traits::{DeviceConnector, DeviceControl, DoorConfigMap, DoorStates};
use tracing::{info, warn};

#[derive(Debug)]
struct Link {
    port_name: String,
    device: Box<dyn DeviceControl>,
}

/// Zero-or-one open controller channel plus what was last read from it.
#[derive(Debug, Default)]
pub struct DeviceSession {
    link: Option<Link>,
    config: Option<DoorConfigMap>,
    config_errors: Vec<String>,
}

impl DeviceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Port of the open session, if any.
    pub fn port_name(&self) -> Option<&str> {
        self.link.as_ref().map(|l| l.port_name.as_str())
    }

    /// Configuration read since the last connect.
    pub fn config(&self) -> Option<&DoorConfigMap> {
        self.config.as_ref()
    }

    /// Errors the controller last reported about its configuration.
    pub fn config_errors(&self) -> &[String] {
        &self.config_errors
    }

    /// Open a channel on `port_name`.
    ///
    /// On failure the session stays disconnected. No configuration is read.
    pub fn connect(&mut self, connector: &dyn DeviceConnector, port_name: &str) -> DeviceResult<()> {
        if let Some(link) = &self.link {
            return Err(DeviceError::AlreadyConnected(link.port_name.clone()));
        }

        let device = connector.connect(port_name)?;
        self.link = Some(Link {
            port_name: port_name.to_string(),
            device,
        });
        info!(port = port_name, "session opened");
        Ok(())
    }

    /// Release the channel, whatever state the controller is in.
    ///
    /// Returns the port that was closed; `None` when already disconnected.
    pub fn disconnect(&mut self) -> Option<String> {
        let mut link = self.link.take()?;
        if let Err(e) = link.device.close() {
            warn!(port = %link.port_name, error = %e, "controller did not close cleanly");
        }
        self.config = None;
        self.config_errors.clear();
        info!(port = %link.port_name, "session closed");
        Some(link.port_name)
    }

    fn device(&mut self) -> DeviceResult<&mut dyn DeviceControl> {
        match self.link.as_mut() {
            Some(link) => {
                let device: &mut dyn DeviceControl = link.device.as_mut();
                Ok(device)
            }
            None => Err(DeviceError::NotConnected),
        }
    }

    /// Ask the controller for its configuration errors and remember them.
    pub fn get_config_errors(&mut self) -> DeviceResult<Vec<String>> {
        let errors = self.device()?.get_config_errors()?;
        self.config_errors = errors.clone();
        Ok(errors)
    }

    /// Fetch and remember the controller's configuration.
    pub fn get_config(&mut self) -> DeviceResult<DoorConfigMap> {
        let config = self.device()?.get_config()?;
        self.config = Some(config.clone());
        Ok(config)
    }

    pub fn get_doors(&mut self) -> DeviceResult<DoorStates> {
        self.device()?.get_doors()
    }

    pub fn set_doors(&mut self, doors: &DoorStates) -> DeviceResult<()> {
        self.device()?.set_doors(doors)
    }
}

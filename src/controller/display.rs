//! Display properties published by the session controller.

use crate::directory::PortDescriptor;
use std::fmt;

/// Label of the connect/disconnect button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenCloseLabel {
    #[default]
    Open,
    Close,
}

impl fmt::Display for OpenCloseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Close => write!(f, "Close"),
        }
    }
}

/// Everything a presentation layer needs to draw the controller's state.
///
/// `door_names` and `door_checks` are parallel; `num_doors` is their length.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayState {
    pub open_close: OpenCloseLabel,
    pub load_enabled: bool,
    /// Ports from the last directory poll.
    pub port_names: Vec<String>,
    /// Info block per entry of `port_names`.
    pub port_details: Vec<String>,
    /// Info block of the connected port.
    pub port_info: String,
    pub config_info: String,
    pub door_names: Vec<String>,
    pub door_checks: Vec<bool>,
    pub num_doors: usize,
    pub error_message: String,
    pub error_visible: bool,
    pub status: String,
    /// A deploy is in flight.
    pub busy: bool,
    pub connected_port: Option<String>,
}

impl DisplayState {
    pub fn is_connected(&self) -> bool {
        self.connected_port.is_some()
    }

    pub(crate) fn set_ports(&mut self, ports: &[PortDescriptor]) {
        self.port_names = ports.iter().map(|p| p.name.clone()).collect();
        self.port_details = ports.iter().map(PortDescriptor::info_text).collect();
    }

    pub(crate) fn set_doors(&mut self, names: Vec<String>, checks: Vec<bool>) {
        self.num_doors = names.len();
        self.door_names = names;
        self.door_checks = checks;
    }

    /// Reset everything that describes an open session.
    pub(crate) fn clear_session(&mut self) {
        self.open_close = OpenCloseLabel::Open;
        self.load_enabled = false;
        self.connected_port = None;
        self.port_info.clear();
        self.config_info.clear();
        self.set_doors(Vec::new(), Vec::new());
    }

    pub(crate) fn show_error(&mut self, message: impl Into<String>) {
        self.error_message = message.into();
        self.error_visible = true;
    }

    pub(crate) fn dismiss_error(&mut self) {
        self.error_message.clear();
        self.error_visible = false;
    }
}

//! servodoor library
//!
//! Core of the servo door controller front end: port discovery, the device
//! session, the configuration pipeline, and the session controller that
//! coordinates them.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Top-level error type
//! - `port`: Serial transport abstraction
//! - `directory`: Serial port discovery
//! - `device`: Door controller protocol and the device session
//! - `pipeline`: Config file validation, config read-back, and deploy
//! - `controller`: Session controller actor and its display state
//! - `tui`: Terminal UI application (when `tui` feature is enabled)

pub mod config;
pub mod controller;
pub mod device;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod port;

// TUI module
#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use controller::{
    Command, ControllerError, ControllerHandle, ControllerSettings, DeployStage, DisplayState,
    SessionController,
};
pub use device::{DeviceConnector, DeviceControl, DeviceError, DeviceSession, DoorState};
pub use directory::{PortDescriptor, PortProvider, SystemPortDirectory};
pub use error::{AppError, AppResult};
pub use pipeline::{AmpyDeployer, Deployer, DeployError};
pub use port::{MockSerialPort, PortConfiguration, PortError, SerialPortAdapter, SyncSerialPort};

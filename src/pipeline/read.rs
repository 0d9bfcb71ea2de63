//! Reading a controller's configuration after connect.

use crate::device::{DeviceSession, DoorConfigMap};
use tracing::{debug, warn};

/// Step of the read sequence that failed to communicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    ConfigErrors,
    Config,
}

impl ReadStage {
    fn command(self) -> &'static str {
        match self {
            Self::ConfigErrors => "get_config_errors",
            Self::Config => "get_config",
        }
    }
}

/// Outcome of reading configuration from a connected controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigRead {
    /// Configuration is valid and was fetched.
    Loaded(DoorConfigMap),
    /// The controller reported problems with its stored configuration.
    Invalid(Vec<String>),
    /// A query failed to communicate.
    CommFailure(ReadStage),
}

impl ConfigRead {
    /// Text for the config info block when nothing was loaded.
    pub fn status_text(&self) -> Option<String> {
        match self {
            Self::Loaded(_) => None,
            Self::Invalid(errors) => Some(format!("errors: {errors:?}")),
            Self::CommFailure(stage) => Some(format!("{}: ok=False", stage.command())),
        }
    }
}

/// Check the controller's configuration errors, then fetch the configuration.
///
/// `get_config` is only issued after `get_config_errors` succeeded with an
/// empty list.
pub fn read_device_config(session: &mut DeviceSession) -> ConfigRead {
    let errors = match session.get_config_errors() {
        Ok(errors) => errors,
        Err(e) => {
            warn!(error = %e, "get_config_errors failed");
            return ConfigRead::CommFailure(ReadStage::ConfigErrors);
        }
    };
    if !errors.is_empty() {
        debug!(count = errors.len(), "controller reports configuration errors");
        return ConfigRead::Invalid(errors);
    }

    match session.get_config() {
        Ok(config) => ConfigRead::Loaded(config),
        Err(e) => {
            warn!(error = %e, "get_config failed");
            ConfigRead::CommFailure(ReadStage::Config)
        }
    }
}

/// Door names in display order.
pub fn door_names(config: &DoorConfigMap) -> Vec<String> {
    // BTreeMap keys are already sorted lexicographically.
    config.keys().cloned().collect()
}

//! Config pipeline: validating candidate files, reading configuration from
//! a connected controller, and deploying new configuration.

pub mod deploy;
pub mod read;
pub mod validate;

pub use deploy::{AmpyDeployer, DeployError, DeployRequest, Deployer, RecordingDeployer};
pub use read::{door_names, read_device_config, ConfigRead, ReadStage};
pub use validate::{strip_file_uri, validate_config_file, ValidationError};

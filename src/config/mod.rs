//! Configuration module for servodoor.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERVODOOR_CONFIG` environment variable (explicit path)
//! 2. `./servodoor.toml` (current directory)
//! 3. The platform config directory (via `directories`)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Commonly tuned values can be overridden with `SERVODOOR_<SECTION>_<KEY>`:
//! - `SERVODOOR_SERIAL_PORT_FILTER=ttyUSB`
//! - `SERVODOOR_DEPLOY_SETTLE_MS=8000`
//! - `SERVODOOR_DEPLOY_ON_FAILURE=proceed`
//!
//! # Example
//!
//! ```rust,no_run
//! use servodoor::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Settle time: {:?}", config.deploy.settle());
//! # Ok::<(), servodoor::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    Config, DeployConfig, DeployFailurePolicy, DeviceConfig, LogFormat, LoggingConfig,
    SerialConfig, TuiConfig,
};

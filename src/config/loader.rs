//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "SERVODOOR";

/// Config file name
const CONFIG_FILE_NAME: &str = "servodoor.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "SERVODOOR_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `SERVODOOR_CONFIG` environment variable (explicit path)
    /// 2. `./servodoor.toml` (current directory)
    /// 3. The platform config directory (`~/.config/servodoor/servodoor.toml`
    ///    on Linux, `%APPDATA%\servodoor\config\servodoor.toml` on Windows)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults; a bad override keeps the default
        if let Err(e) = apply_env_overrides(&mut config) {
            tracing::warn!(error = %e, "ignoring invalid environment override");
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    if let Some(app_config) = get_default_config_path() {
        if app_config.exists() {
            return Some(app_config);
        }
    }

    None
}

/// Get the default config directory for creating new config files.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "servodoor").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{}_{}", ENV_PREFIX, key);
    std::env::var(&var).ok().map(|val| (var, val))
}

fn parse_env<T: std::str::FromStr>(var: &str, val: &str, what: &str) -> ConfigResult<T> {
    val.trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, format!("invalid {what}: '{val}'")))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `SERVODOOR_<SECTION>_<KEY>`
/// For example:
/// - `SERVODOOR_SERIAL_BAUD_RATE=9600`
/// - `SERVODOOR_DEPLOY_SETTLE_MS=8000`
/// - `SERVODOOR_DEPLOY_ON_FAILURE=proceed`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some((var, val)) = env_var("SERIAL_BAUD_RATE") {
        config.serial.baud_rate = parse_env(&var, &val, "baud rate")?;
    }
    if let Some((var, val)) = env_var("SERIAL_POLL_INTERVAL_MS") {
        config.serial.poll_interval_ms = parse_env(&var, &val, "interval")?;
    }
    if let Some((_, val)) = env_var("SERIAL_PORT_FILTER") {
        // An empty filter lists every port
        config.serial.port_filter = if val.is_empty() { None } else { Some(val) };
    }

    // Device overrides
    if let Some((var, val)) = env_var("DEVICE_RESPONSE_TIMEOUT_MS") {
        config.device.response_timeout_ms = parse_env(&var, &val, "timeout")?;
    }

    // Deploy overrides
    if let Some((_, val)) = env_var("DEPLOY_TOOL") {
        config.deploy.tool = val;
    }
    if let Some((var, val)) = env_var("DEPLOY_SETTLE_MS") {
        config.deploy.settle_ms = parse_env(&var, &val, "settle time")?;
    }
    if let Some((var, val)) = env_var("DEPLOY_ON_FAILURE") {
        config.deploy.on_failure = val
            .parse()
            .map_err(|msg: String| ConfigError::env_parse(var, msg))?;
    }

    // Logging overrides
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }

    Ok(())
}

/// Reject values that would stall the controller or never open a port.
fn validate(config: &Config) -> ConfigResult<()> {
    if config.serial.baud_rate == 0 {
        return Err(ConfigError::validation("serial.baud_rate", "must be non-zero"));
    }
    if config.serial.poll_interval_ms == 0 {
        return Err(ConfigError::validation(
            "serial.poll_interval_ms",
            "must be non-zero",
        ));
    }
    if config.deploy.tool.trim().is_empty() {
        return Err(ConfigError::validation("deploy.tool", "must name an executable"));
    }
    Ok(())
}

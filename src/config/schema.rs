//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial port and discovery settings
    pub serial: SerialConfig,
    /// Door controller protocol settings
    pub device: DeviceConfig,
    /// Configuration upload settings
    pub deploy: DeployConfig,
    /// TUI configuration
    pub tui: TuiConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial port configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate used to open controller ports
    pub baud_rate: u32,
    /// Timeout for a single read call in milliseconds
    pub read_timeout_ms: u64,
    /// Only list ports whose name contains this substring
    pub port_filter: Option<String>,
    /// Port list refresh interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            read_timeout_ms: 100,
            port_filter: default_port_filter(),
            poll_interval_ms: 5000,
        }
    }
}

/// Linux exposes dozens of `ttyS*` devices that are never controllers.
fn default_port_filter() -> Option<String> {
    if cfg!(target_os = "linux") {
        Some("ttyACM".to_string())
    } else {
        None
    }
}

impl SerialConfig {
    /// Get the read timeout as Duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Get the port poll interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Door controller protocol section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Maximum wait for one reply line in milliseconds
    pub response_timeout_ms: u64,
    /// Send a ping on connect and require an answer
    pub handshake: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 2000,
            handshake: true,
        }
    }
}

impl DeviceConfig {
    /// Get the reply timeout as Duration
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// What to do when the upload or the hard reset fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployFailurePolicy {
    /// Stop before reconnecting and leave the device disconnected
    #[default]
    Abort,
    /// Settle and reconnect anyway
    Proceed,
}

impl std::str::FromStr for DeployFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "proceed" => Ok(Self::Proceed),
            other => Err(format!("expected 'abort' or 'proceed', got '{other}'")),
        }
    }
}

/// Configuration upload section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Upload tool invoked as `<tool> -p <port> put <file>` and `<tool> -p <port> reset --hard`
    pub tool: String,
    /// Delay between announcing the upload and starting it, in milliseconds
    pub pre_deploy_delay_ms: u64,
    /// Wait after the hard reset before reconnecting, in milliseconds
    pub settle_ms: u64,
    /// Reaction to a failed upload or reset
    pub on_failure: DeployFailurePolicy,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            tool: "ampy".to_string(),
            pre_deploy_delay_ms: 200,
            settle_ms: 5000,
            on_failure: DeployFailurePolicy::Abort,
        }
    }
}

impl DeployConfig {
    /// Get the pre-deploy delay as Duration
    pub fn pre_deploy_delay(&self) -> Duration {
        Duration::from_millis(self.pre_deploy_delay_ms)
    }

    /// Get the post-reset settle time as Duration
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// TUI configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Theme name: "dark" or "light"
    pub theme: String,
    /// Refresh rate in Hz
    pub refresh_rate_hz: u32,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            refresh_rate_hz: 20,
        }
    }
}

impl TuiConfig {
    /// Get refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(1000 / self.refresh_rate_hz.max(1) as u64)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log file path; without one, logs are discarded while the TUI runs
    pub file: Option<PathBuf>,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Multi-line human format
    Pretty,
    /// Compact format
    #[default]
    Compact,
}

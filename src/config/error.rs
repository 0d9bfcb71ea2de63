//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid servodoor config: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot render configuration as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value parsed but is unusable, e.g. a zero baud rate.
    #[error("{key} {message}")]
    Invalid { key: String, message: String },

    /// A `SERVODOOR_*` override could not be parsed.
    #[error("environment override {var}: {message}")]
    Env { var: String, message: String },
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env_parse(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Env {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

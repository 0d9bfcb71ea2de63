use crate::config::ConfigError;
use crate::controller::ControllerError;
use thiserror::Error;

/// A specialized `Result` type for application startup and shutdown.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that can end the process.
///
/// Nothing raised inside the session lifecycle lands here; the controller
/// turns those into display updates. These are the failures around it:
/// configuration, logging, the terminal, and the controller task itself.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error("logging setup failed: {0}")]
    Logging(String),

    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging(message.into())
    }
}

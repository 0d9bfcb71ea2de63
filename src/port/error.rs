//! Serial transport errors.
//!
//! This layer knows nothing about the door protocol; `DeviceError` wraps
//! these with the command that was being sent.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("no serial device at {0}")]
    NotFound(String),

    /// The OS refused the line settings.
    #[error("line settings rejected: {0}")]
    Settings(String),

    #[error("no data within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serial(#[from] serialport::Error),
}

impl PortError {
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings(message.into())
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Timeout(after)
    }

    /// True when the read simply found no data yet; the caller should keep
    /// waiting until its own deadline.
    pub fn is_idle(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_messages() {
        assert_eq!(
            PortError::not_found("/dev/ttyACM0").to_string(),
            "no serial device at /dev/ttyACM0"
        );
        assert_eq!(
            PortError::Io(std::io::Error::new(ErrorKind::BrokenPipe, "device disconnected"))
                .to_string(),
            "device disconnected"
        );
    }

    #[test]
    fn test_only_quiet_reads_are_idle() {
        assert!(PortError::timeout(Duration::from_millis(1)).is_idle());
        assert!(PortError::Io(ErrorKind::WouldBlock.into()).is_idle());
        assert!(PortError::Io(ErrorKind::TimedOut.into()).is_idle());
        assert!(!PortError::Io(ErrorKind::BrokenPipe.into()).is_idle());
        assert!(!PortError::settings("baud 0").is_idle());
    }
}

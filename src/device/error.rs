//! Door controller error types.

use crate::port::PortError;
use thiserror::Error;

/// Errors raised while talking to a door controller.
///
/// Any of these coming back from a query is a communication failure; a
/// controller that answers with a non-empty configuration error list is a
/// successful query and is not represented here.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The serial transport failed.
    #[error("transport error on {port}: {source}")]
    Port {
        port: String,
        #[source]
        source: PortError,
    },

    /// The controller did not answer the connect handshake.
    #[error("no handshake from {port}: {reason}")]
    Handshake { port: String, reason: String },

    /// The controller answered `ok: false`.
    #[error("controller rejected '{command}'")]
    Rejected { command: String },

    /// No reply line arrived in time.
    #[error("no reply to '{command}' within {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },

    /// A reply arrived but did not have the expected shape.
    #[error("malformed reply to '{command}': {detail}")]
    Malformed { command: String, detail: String },

    /// A session is already open.
    #[error("a device session is already open on {0}")]
    AlreadyConnected(String),

    /// The operation needs an open session.
    #[error("no device session is open")]
    NotConnected,
}

impl DeviceError {
    pub(crate) fn port(port: impl Into<String>, source: PortError) -> Self {
        Self::Port {
            port: port.into(),
            source,
        }
    }

    pub(crate) fn malformed(command: impl Into<String>, detail: impl ToString) -> Self {
        Self::Malformed {
            command: command.into(),
            detail: detail.to_string(),
        }
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;

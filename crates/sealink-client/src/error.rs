// ============================================
// File: crates/sealink-client/src/error.rs
// ============================================
//! # Client Error Types
//!
//! ## Creation Reason
//! Gives callers of `open`/`send` one error type that says which stage
//! of an exchange failed, independent of the transport and crypto layers
//! underneath.
//!
//! ## Error Categories
//! - Connection: `Dial`, `Closed`, `Timeout`
//! - Handshake: `Handshake`, `KeyGeneration`
//! - Payload: `Encryption`, `Decryption`, `Encode`, `Decode`, `Rejected`
//! - Configuration: `Config`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use sealink_core::error::CoreError;
use sealink_transport::error::TransportError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error types.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server could not be reached.
    #[error("Cannot reach {addr}: {reason}")]
    Dial {
        /// `host:port` that was dialed
        addr: String,
        /// Why dialing failed
        reason: String,
    },

    /// The handshake response was missing or unusable.
    #[error("Handshake failed: {reason}")]
    Handshake {
        /// What was wrong with the response
        reason: String,
    },

    /// The client RSA keypair could not be generated.
    #[error("Key generation failed: {reason}")]
    KeyGeneration {
        /// Underlying failure
        reason: String,
    },

    /// A request body could not be encrypted.
    #[error("Encryption failed: {reason}")]
    Encryption {
        /// Underlying failure
        reason: String,
    },

    /// A response body failed authentication.
    #[error("Decryption failed: response did not authenticate")]
    Decryption,

    /// A request could not be framed.
    #[error("Encode failed: {reason}")]
    Encode {
        /// Underlying failure
        reason: String,
    },

    /// A response frame was invalid.
    #[error("Decode failed: {reason}")]
    Decode {
        /// Underlying failure
        reason: String,
    },

    /// The connection was closed while in use.
    #[error("Connection closed")]
    Closed,

    /// An operation did not complete in time.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// What timed out
        operation: String,
    },

    /// The server answered with an `Error` message.
    #[error("Request rejected by server: {reason}")]
    Rejected {
        /// Reason sent by the server
        reason: String,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Invalid configuration: {reason}")]
    Config {
        /// What is wrong
        reason: String,
    },

    /// Other transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Other core failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ClientError {
    /// Creates a `Dial` error.
    pub fn dial(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dial {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Handshake` error.
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::Handshake {
            reason: reason.into(),
        }
    }

    /// Creates a `Config` error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Classifies a failure to establish a connection to `addr`.
    pub(crate) fn from_dial(addr: &str, err: TransportError) -> Self {
        match err {
            TransportError::Timeout { operation } => Self::Timeout { operation },
            TransportError::Dial { addr, reason } => Self::Dial { addr, reason },
            other => Self::dial(addr, other.to_string()),
        }
    }

    /// Classifies a failure while reading a response.
    pub(crate) fn from_read(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionClosed => Self::Closed,
            TransportError::Timeout { operation } => Self::Timeout { operation },
            TransportError::Codec(e) => Self::Decode {
                reason: e.to_string(),
            },
            other if other.is_disconnect() => Self::Closed,
            other => Self::Transport(other),
        }
    }

    /// Classifies a failure while writing a request.
    pub(crate) fn from_write(err: TransportError) -> Self {
        match err {
            TransportError::Codec(e) => Self::Encode {
                reason: e.to_string(),
            },
            TransportError::ConnectionClosed => Self::Closed,
            other if other.is_disconnect() => Self::Closed,
            other => Self::Transport(other),
        }
    }

    /// Classifies a keypair generation failure.
    pub(crate) fn from_key_generation(err: CoreError) -> Self {
        Self::KeyGeneration {
            reason: err.to_string(),
        }
    }

    /// Returns `true` if the failure tore down the connection, so the
    /// next `send` will redial.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Dial { .. }
                | Self::Closed
                | Self::Timeout { .. }
                | Self::Encode { .. }
                | Self::Decode { .. }
                | Self::Transport(_)
        )
    }

    /// Returns `true` if repeating the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Dial { .. } | Self::Closed | Self::Timeout { .. } => true,
            Self::Transport(e) => e.is_retryable() || e.is_disconnect(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_classification() {
        assert!(matches!(
            ClientError::from_read(TransportError::ConnectionClosed),
            ClientError::Closed
        ));
        assert!(matches!(
            ClientError::from_read(TransportError::timeout("reading")),
            ClientError::Timeout { .. }
        ));
        assert!(matches!(
            ClientError::from_read(TransportError::Codec(CoreError::malformed("bad"))),
            ClientError::Decode { .. }
        ));
        assert!(matches!(
            ClientError::from_read(TransportError::io(
                "reading",
                io::Error::from(io::ErrorKind::ConnectionReset)
            )),
            ClientError::Closed
        ));
    }

    #[test]
    fn test_write_classification() {
        assert!(matches!(
            ClientError::from_write(TransportError::Codec(CoreError::too_large(1, 2))),
            ClientError::Encode { .. }
        ));
        assert!(matches!(
            ClientError::from_write(TransportError::io(
                "writing",
                io::Error::from(io::ErrorKind::BrokenPipe)
            )),
            ClientError::Closed
        ));
    }

    #[test]
    fn test_dial_classification() {
        let err = ClientError::from_dial("h:1", TransportError::timeout("connecting to h:1"));
        assert!(matches!(err, ClientError::Timeout { .. }));
        assert!(err.is_retryable());

        let err = ClientError::from_dial("h:1", TransportError::dial("h:1", "refused"));
        assert!(matches!(err, ClientError::Dial { ref addr, .. } if addr == "h:1"));
    }

    #[test]
    fn test_rejected_is_not_retryable() {
        let err = ClientError::Rejected {
            reason: "decryption failed".into(),
        };
        assert!(!err.is_retryable());
        assert!(!err.is_connection_error());
        assert!(err.to_string().contains("decryption failed"));
    }
}

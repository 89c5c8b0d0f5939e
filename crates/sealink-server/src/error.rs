// ============================================
// File: crates/sealink-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use sealink_core::error::CoreError;
use sealink_transport::error::TransportError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Session limit reached: max {limit} sessions")]
    SessionLimitReached {
        limit: usize,
    },

    #[error("Session already exists for {0}")]
    SessionExists(std::net::SocketAddr),

    #[error("Listener is already open")]
    AlreadyOpen,

    #[error("Listener is not open")]
    NotOpen,

    #[error("Server failed to start: {reason}")]
    StartupFailed {
        reason: String,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    #[must_use]
    pub const fn is_session_error(&self) -> bool {
        matches!(self, Self::SessionLimitReached { .. } | Self::SessionExists(_))
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::StartupFailed { .. })
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::SessionLimitReached { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::config_load("/etc/sealink/server.toml", "file not found");
        assert!(err.to_string().contains("/etc/sealink/server.toml"));

        let err = ServerError::SessionLimitReached { limit: 8 };
        assert!(err.to_string().contains('8'));
    }

    #[test]
    fn test_error_classification() {
        let config_err = ServerError::config_invalid("keys.rsa_bits", "must be at least 2048");
        assert!(config_err.is_config_error());
        assert!(!config_err.is_fatal());

        let limit = ServerError::SessionLimitReached { limit: 1 };
        assert!(limit.is_session_error());
        assert!(limit.is_retryable());

        assert!(ServerError::startup_failed("bind").is_fatal());
    }
}

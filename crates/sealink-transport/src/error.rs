// ============================================
// File: crates/sealink-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! Defines error types for TCP dialing, listening and framed I/O.
//!
//! ## Error Categories
//! 1. **Connection Errors**: Dial, bind, peer closed
//! 2. **Framing Errors**: Anything the codec rejects
//! 3. **System Errors**: I/O and timeouts
//!
//! ## ⚠️ Important Note for Next Developer
//! - A framing error leaves the stream unusable; callers must drop it
//! - `ConnectionClosed` is only returned for a clean EOF between frames
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use sealink_core::error::CoreError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer error types.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Connection Errors
    // ========================================

    /// Failed to connect to a remote endpoint.
    #[error("Failed to dial {addr}: {reason}")]
    Dial {
        /// Address we tried to reach
        addr: String,
        /// Why dialing failed
        reason: String,
    },

    /// Failed to bind a listening socket.
    #[error("Failed to bind to {addr}: {reason}")]
    Bind {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Peer closed the connection between two frames.
    #[error("Connection closed by peer")]
    ConnectionClosed,

    /// Operation timed out.
    #[error("Operation timed out: {operation}")]
    Timeout {
        /// What operation timed out
        operation: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Frame could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(#[from] CoreError),
}

impl TransportError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `Dial` error.
    pub fn dial(addr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Dial {
            addr: addr.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Bind` error.
    pub fn bind(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::Bind {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if the peer sent bytes that do not form a valid frame.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(self, Self::Codec(_))
    }

    /// Returns `true` if the connection is gone and a fresh dial is needed.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
            ),
            _ => false,
        }
    }

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Dial { .. } => true,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::bind("127.0.0.1:8080".parse().unwrap(), "address in use");
        assert!(err.to_string().contains("127.0.0.1:8080"));
        assert!(err.to_string().contains("address in use"));

        let err = TransportError::dial("example.invalid:1", "refused");
        assert!(err.to_string().contains("example.invalid:1"));
    }

    #[test]
    fn test_error_classification() {
        let codec: TransportError = CoreError::malformed("bad flags").into();
        assert!(codec.is_decode_error());
        assert!(!codec.is_retryable());

        assert!(TransportError::timeout("read").is_retryable());
        assert!(TransportError::ConnectionClosed.is_disconnect());

        let reset = TransportError::io(
            "reading frame",
            io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        );
        assert!(reset.is_disconnect());
        assert!(!reset.is_decode_error());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::WouldBlock, "would block");
        let transport_err: TransportError = io_err.into();
        assert!(transport_err.is_retryable());
    }
}

// ============================================
// File: crates/sealink-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes identifier types shared by the client and server so that
//! log lines on both sides refer to a connection the same way.
//!
//! ## Main Functionality
//! - `ClientId`: Stable client identity derived from the host machine id
//!   and the remote port, with a random fallback
//!
//! ## Derivation
//! ```text
//! ClientId = SHA-256(machine-id || port_le)[0..16]
//! ```
//! When no machine id can be read (containers, non-Linux hosts) the id is
//! 16 random bytes and therefore only stable for the process lifetime.
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::fmt;
use std::path::Path;

use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Size of a `ClientId` in bytes.
pub const CLIENT_ID_SIZE: usize = 16;

/// Well-known locations of the host machine id.
const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

// ============================================
// ClientId
// ============================================

/// Stable identifier of a client connection.
///
/// # Example
/// ```
/// use sealink_common::types::ClientId;
///
/// let a = ClientId::from_machine_id("4c4c4544-0031", 9000);
/// let b = ClientId::from_machine_id("4c4c4544-0031", 9000);
/// let c = ClientId::from_machine_id("4c4c4544-0031", 9001);
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId([u8; CLIENT_ID_SIZE]);

impl ClientId {
    /// Derives the id for a connection to `port` from this host's machine id.
    ///
    /// Falls back to [`ClientId::random`] when no machine id is readable.
    #[must_use]
    pub fn derive(port: u16) -> Self {
        match read_machine_id() {
            Some(machine_id) => Self::from_machine_id(&machine_id, port),
            None => {
                debug!("No machine id available, using random client id");
                Self::random()
            }
        }
    }

    /// Derives the id from an explicit machine id string.
    #[must_use]
    pub fn from_machine_id(machine_id: &str, port: u16) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(machine_id.trim().as_bytes());
        hasher.update(port.to_le_bytes());
        let digest = hasher.finalize();

        let mut id = [0u8; CLIENT_ID_SIZE];
        id.copy_from_slice(&digest[..CLIENT_ID_SIZE]);
        Self(id)
    }

    /// Generates a random id.
    #[must_use]
    pub fn random() -> Self {
        let mut id = [0u8; CLIENT_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut id);
        Self(id)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CLIENT_ID_SIZE] {
        &self.0
    }
}

fn read_machine_id() -> Option<String> {
    MACHINE_ID_PATHS.iter().find_map(|path| {
        std::fs::read_to_string(Path::new(path))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// ============================================
// Tests
// ============================================

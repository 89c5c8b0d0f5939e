// ============================================
// File: crates/sealink-server/src/services/registry.rs
// ============================================
//! # Connection Registry
//!
//! ## Creation Reason
//! Tracks every live client connection together with the key material
//! negotiated for it.
//!
//! ## Main Functionality
//! - `ClientSession`: Per-connection state (session key, client key, stats)
//! - `ConnectionRegistry`: Concurrent map from peer address to session
//!
//! ## Session Lifecycle
//! ```text
//! accept ──► add() ──► handshake sets public_key ──► data exchanges
//!                                                        │
//!                    remove() ◄── decode error or EOF ◄──┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Sessions are stored in a DashMap for concurrent access
//! - The connection task is the only caller of `remove`
//! - Never hold a DashMap guard across an `.await`
//!
//! ## Last Modified
//! v0.1.0 - Initial registry implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::info;

use sealink_core::crypto::{PublicKey, SessionKey};

use crate::error::{Result, ServerError};

// ============================================
// Session Statistics
// ============================================

/// Session statistics.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub messages_rx: AtomicU64,
    pub messages_tx: AtomicU64,
    pub bytes_rx: AtomicU64,
    pub bytes_tx: AtomicU64,
    pub decrypt_failures: AtomicU64,
}

impl SessionStats {
    pub fn record_rx(&self, bytes: u64) {
        self.bytes_rx.fetch_add(bytes, Ordering::Relaxed);
        self.messages_rx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tx(&self, bytes: u64) {
        self.bytes_tx.fetch_add(bytes, Ordering::Relaxed);
        self.messages_tx.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decrypt_failure(&self) {
        self.decrypt_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            messages_rx: self.messages_rx.load(Ordering::Relaxed),
            messages_tx: self.messages_tx.load(Ordering::Relaxed),
            bytes_rx: self.bytes_rx.load(Ordering::Relaxed),
            bytes_tx: self.bytes_tx.load(Ordering::Relaxed),
            decrypt_failures: self.decrypt_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub messages_rx: u64,
    pub messages_tx: u64,
    pub bytes_rx: u64,
    pub bytes_tx: u64,
    pub decrypt_failures: u64,
}

// ============================================
// ClientSession
// ============================================

/// State of one accepted client connection.
pub struct ClientSession {
    /// Peer address, unique among live sessions.
    pub id: SocketAddr,
    public_key: RwLock<Option<PublicKey>>,
    session_key: SessionKey,
    pub connected_at: Instant,
    pub stats: SessionStats,
}

impl ClientSession {
    /// Creates a session for `id` with a freshly generated session key.
    #[must_use]
    pub fn new(id: SocketAddr) -> Self {
        Self {
            id,
            public_key: RwLock::new(None),
            session_key: SessionKey::generate(),
            connected_at: Instant::now(),
            stats: SessionStats::default(),
        }
    }

    /// Returns the client's public key, if a handshake supplied one.
    #[must_use]
    pub fn public_key(&self) -> Option<PublicKey> {
        self.public_key.read().clone()
    }

    /// Records the client's public key.
    pub fn set_public_key(&self, key: Option<PublicKey>) {
        *self.public_key.write() = key;
    }

    /// Returns `true` once a client public key is known, meaning bodies
    /// on this connection are encrypted.
    #[must_use]
    pub fn is_secured(&self) -> bool {
        self.public_key.read().is_some()
    }

    /// Returns the session key.
    #[must_use]
    pub fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    /// Time since the connection was accepted.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl std::fmt::Debug for ClientSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSession")
            .field("id", &self.id)
            .field("public_key", &self.public_key.read().as_ref().map(PublicKey::fingerprint))
            .field("age", &self.age())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

// ============================================
// ConnectionRegistry
// ============================================

/// Concurrent registry of live client sessions.
pub struct ConnectionRegistry {
    sessions: DashMap<SocketAddr, Arc<ClientSession>>,
    max_sessions: usize,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
        }
    }

    /// Creates and registers a session for a newly accepted peer.
    ///
    /// # Errors
    /// - `SessionLimitReached` if `max_sessions` sessions are live
    /// - `SessionExists` if `addr` is already registered
    pub fn add(&self, addr: SocketAddr) -> Result<Arc<ClientSession>> {
        if self.sessions.len() >= self.max_sessions {
            return Err(ServerError::SessionLimitReached {
                limit: self.max_sessions,
            });
        }

        match self.sessions.entry(addr) {
            Entry::Occupied(_) => Err(ServerError::SessionExists(addr)),
            Entry::Vacant(slot) => {
                let session = Arc::new(ClientSession::new(addr));
                slot.insert(Arc::clone(&session));
                info!(peer = %addr, "Session created");
                Ok(session)
            }
        }
    }

    pub fn remove(&self, addr: &SocketAddr) -> Option<Arc<ClientSession>> {
        let removed = self.sessions.remove(addr).map(|(_, s)| s);

        if let Some(ref session) = removed {
            let stats = session.stats.snapshot();
            info!(
                peer = %addr,
                secured = session.is_secured(),
                duration_ms = session.age().as_millis() as u64,
                messages_rx = stats.messages_rx,
                messages_tx = stats.messages_tx,
                bytes_rx = stats.bytes_rx,
                bytes_tx = stats.bytes_tx,
                decrypt_failures = stats.decrypt_failures,
                "Session removed"
            );
        }

        removed
    }

    #[must_use]
    pub fn get(&self, addr: &SocketAddr) -> Option<Arc<ClientSession>> {
        self.sessions.get(addr).map(|r| Arc::clone(r.value()))
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<SocketAddr> {
        self.sessions.iter().map(|r| *r.key()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("sessions", &self.count())
            .field("max_sessions", &self.max_sessions)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_add_get_remove() {
        let registry = ConnectionRegistry::new(8);
        assert!(registry.is_empty());

        let session = registry.add(addr(1000)).unwrap();
        assert_eq!(session.id, addr(1000));
        assert!(!session.is_secured());
        assert_eq!(registry.count(), 1);
        assert!(registry.get(&addr(1000)).is_some());

        let removed = registry.remove(&addr(1000)).unwrap();
        assert!(Arc::ptr_eq(&session, &removed));
        assert!(registry.is_empty());
        assert!(registry.remove(&addr(1000)).is_none());
    }

    #[test]
    fn test_duplicate_address_rejected() {
        let registry = ConnectionRegistry::new(8);
        registry.add(addr(1000)).unwrap();

        assert!(matches!(
            registry.add(addr(1000)),
            Err(ServerError::SessionExists(a)) if a == addr(1000)
        ));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_session_limit() {
        let registry = ConnectionRegistry::new(2);
        registry.add(addr(1)).unwrap();
        registry.add(addr(2)).unwrap();

        assert!(matches!(
            registry.add(addr(3)),
            Err(ServerError::SessionLimitReached { limit: 2 })
        ));

        registry.remove(&addr(1));
        assert!(registry.add(addr(3)).is_ok());
    }

    #[test]
    fn test_ids_snapshot() {
        let registry = ConnectionRegistry::new(8);
        for port in [10, 20, 30] {
            registry.add(addr(port)).unwrap();
        }

        let mut ids = registry.ids();
        ids.sort();
        assert_eq!(ids, vec![addr(10), addr(20), addr(30)]);
    }

    #[test]
    fn test_each_session_gets_its_own_key() {
        let registry = ConnectionRegistry::new(8);
        let a = registry.add(addr(1)).unwrap();
        let b = registry.add(addr(2)).unwrap();
        assert_ne!(a.session_key(), b.session_key());
    }

    #[test]
    fn test_stats() {
        let session = ClientSession::new(addr(1));
        session.stats.record_rx(100);
        session.stats.record_tx(40);
        session.stats.record_decrypt_failure();

        let snapshot = session.stats.snapshot();
        assert_eq!(snapshot.messages_rx, 1);
        assert_eq!(snapshot.bytes_rx, 100);
        assert_eq!(snapshot.messages_tx, 1);
        assert_eq!(snapshot.bytes_tx, 40);
        assert_eq!(snapshot.decrypt_failures, 1);
    }
}

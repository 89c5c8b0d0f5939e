// ============================================
// File: crates/sealink-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Provides the session bookkeeping and key exchange logic of the SeaLink
//! server, separated from socket handling.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`registry`]: Live connection tracking
//! - [`handshake`]: Handshake processing service
//!
//! ## Service Interactions
//! 1. The accept loop registers each connection in the `ConnectionRegistry`
//! 2. `HandshakeService` records the client key on the session and wraps
//!    the session key for it
//! 3. The connection task deregisters the session when it ends
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod handshake;
pub mod registry;

// Re-export primary types
pub use handshake::HandshakeService;
pub use registry::{ClientSession, ConnectionRegistry, SessionStats, StatsSnapshot};

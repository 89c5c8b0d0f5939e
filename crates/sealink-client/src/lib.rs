// ============================================
// File: crates/sealink-client/src/lib.rs
// ============================================
//! # SeaLink Client Library
//!
//! ## Creation Reason
//! Client side of SeaLink: a persistent TCP connection that negotiates a
//! session key over RSA and exchanges AES-GCM protected request/response
//! messages.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Connection settings
//! - [`connection`]: `ClientConnection` and its state machine
//! - [`prober`]: Optional 1-second liveness prober
//! - [`error`]: Client error types
//!
//! ## Architecture Overview
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    ClientConnection                      │
//! ├──────────────────────────────────────────────────────────┤
//! │  open ──► dial ──► handshake ──► Secured                 │
//! │  send ──► seal ──► write ──► read ──► open ──► reply     │
//! │  close ─► shutdown socket, stop prober                   │
//! │                                                          │
//! │  EventEmitter ◄── Connect / Disconnect ── Prober         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial client library

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod error;
pub mod prober;

// Re-export primary types
pub use config::ClientConfig;
pub use connection::{ClientConnection, ConnectionState};
pub use error::{ClientError, Result};
pub use prober::PING_INTERVAL;

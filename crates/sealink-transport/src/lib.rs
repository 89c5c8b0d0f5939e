// ============================================
// File: crates/sealink-transport/src/lib.rs
// ============================================
//! # SeaLink Transport - Network I/O Layer
//!
//! ## Creation Reason
//! Provides the framed TCP stream shared by the SeaLink client and server,
//! together with dial, probe and listen helpers.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`tcp`]: `FramedStream`, `dial`, `probe`, `bind_listener`
//! - [`error`]: Transport-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │        sealink-server          sealink-client       │
//! │              │                        │             │
//! │              └───────────┬────────────┘             │
//! │                          ▼                          │
//! │                 sealink-transport                   │
//! │                  You are here ◄──                   │
//! │                          │                          │
//! │                          ▼                          │
//! │                    sealink-core                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The transport never encrypts; bodies arrive here already sealed
//! - Keep `FramedStream` generic so tests can use `tokio::io::duplex`
//!
//! ## Last Modified
//! v0.1.0 - Initial transport layer implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod tcp;

// Re-export primary types
pub use error::{Result, TransportError};
pub use tcp::{bind_listener, dial, probe, FramedStream};

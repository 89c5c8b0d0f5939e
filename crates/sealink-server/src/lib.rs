// ============================================
// File: crates/sealink-server/src/lib.rs
// ============================================
//! # SeaLink Server Library
//!
//! ## Creation Reason
//! Provides the server side of SeaLink: a TCP listener that answers RSA
//! handshakes and dispatches session-encrypted messages to one
//! application handler.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Server configuration management
//! - [`server`]: Listener lifecycle and per-connection loop
//! - [`services`]: Session bookkeeping and key exchange
//!   - [`services::registry`]: Live connection tracking
//!   - [`services::handshake`]: Handshake processing
//! - [`handlers`]: Application message dispatch
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        SeaLink Server                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │   Config    │────►│  Listener   │────►│    Handlers     │    │
//! │  │             │     │             │     │  (dispatcher)   │    │
//! │  └─────────────┘     └──────┬──────┘     └─────────────────┘    │
//! │                             │                                   │
//! │         ┌───────────────────┴───────────────────┐               │
//! │         ▼                                       ▼               │
//! │  ┌─────────────┐                         ┌─────────────┐        │
//! │  │ Connection  │                         │  Handshake  │        │
//! │  │  Registry   │                         │   Service   │        │
//! │  └─────────────┘                         └─────────────┘        │
//! │                                                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                     Transport Layer                             │
//! │          FramedStream over TCP (length-prefixed frames)         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! Client → TCP → Decode → Decrypt → Handler → Encrypt → Encode → TCP → Client
//! ```
//!
//! ## Example
//! ```no_run
//! use bytes::Bytes;
//! use sealink_core::protocol::Message;
//! use sealink_server::{Listener, ServerConfig};
//!
//! # async fn run() -> sealink_server::Result<()> {
//! let listener = Listener::new(ServerConfig::default());
//! listener.on_message(|msg: &Message| -> Option<Bytes> { Some(msg.body.clone()) });
//! let addr = listener.open().await?;
//! println!("listening on {}", addr);
//! # Ok(())
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration changes require restart (no hot-reload)
//! - `close` does not terminate already-accepted sessions
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod services;

// Re-export primary types
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use handlers::MessageHandler;
pub use server::Listener;

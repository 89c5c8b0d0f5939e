// ============================================
// File: crates/sealink-server/src/handlers/mod.rs
// ============================================
//! # Message Handlers
//!
//! ## Creation Reason
//! Provides the application-facing side of the server: the handler trait
//! and the dispatcher that wraps it in session encryption.
//!
//! ### Submodules
//! - [`message`]: `MessageHandler` trait and `MessageDispatcher`
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod message;

pub use message::{MessageDispatcher, MessageHandler};

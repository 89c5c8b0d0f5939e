// ============================================
// File: crates/sealink-common/src/lib.rs
// ============================================
//! # SeaLink Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types and utilities shared across all SeaLink crates,
//! so connections are identified and observed the same way everywhere.
//!
//! ## Main Functionality
//! - [`types`]: Core type definitions (`ClientId`)
//! - [`events`]: Connect/disconnect notification emitter
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │       sealink-server          sealink-client        │
//! │              │                   │       │          │
//! │              ▼                   │       ▼          │
//! │      sealink-transport ◄─────────┘  sealink-common  │
//! │              │                      ◄── You are here│
//! │              ▼                                      │
//! │        sealink-core                                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the client depends on this crate; the server logs by socket address
//! - No process-wide state lives here; emitters are owned by their connection
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod events;
pub mod types;

// Re-export commonly used items at crate root
pub use events::{ConnectionEvent, EventEmitter};
pub use types::ClientId;

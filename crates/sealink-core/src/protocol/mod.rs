// ============================================
// File: crates/sealink-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the message envelope exchanged between SeaLink clients and
//! servers, and the length-prefixed binary framing that carries it over
//! a TCP stream.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`messages`]: `Message` envelope and `MessageKind` tag
//! - [`codec`]: Binary serialization/deserialization of frames
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │                                                             │
//! │  Client ──── Handshake { client_pk?, "ACK" } ─────► Server  │
//! │  Client ◄─── Handshake { server_pk, blob?, "ACK" } ─ Server │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Transport Phase                          │
//! │                                                             │
//! │  Client ══════ Data (encrypted when keyed) ═══════ Server   │
//! │  Client ◄───── Data | Error ────────────────────── Server   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format Principles
//! - Little-endian byte order for multi-byte integers
//! - Every frame starts with its own length
//! - Version field in every frame
//!
//! ## ⚠️ Important Note for Next Developer
//! - ANY wire change requires a `PROTOCOL_VERSION` bump
//! - Add new message kinds at the end of the tag space
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod codec;
pub mod messages;

// Re-export primary types
pub use codec::{decode_frame, encode, ProtocolCodec};
pub use messages::{Message, MessageKind};

// ============================================
// Constants
// ============================================

/// Current wire protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Body carried by both handshake messages.
pub const HANDSHAKE_MARKER: &[u8] = b"ACK";

/// Body returned when a handler has nothing to say.
pub const ACK_OK: &[u8] = b"true";

/// Largest accepted frame, excluding the 4-byte length prefix.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

// ============================================
// File: crates/sealink-core/src/lib.rs
// ============================================
//! # SeaLink Core - Protocol & Cryptography Library
//!
//! ## Creation Reason
//! Provides the message envelope, its wire codec and the cryptographic
//! primitives used to establish and use a per-connection session key.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - `Message` envelope with an explicit `MessageKind` tag
//! - Length-prefixed binary codec for streaming transports
//!
//! ### Crypto Module ([`crypto`])
//! - RSA keypairs and RSA-OAEP key transport
//! - AES-256-GCM payload encryption with a random nonce per message
//! - `SessionKey` generation
//!
//! ## Handshake at a Glance
//! ```text
//! Client                                          Server
//!   │  Handshake { public_key: client_pk, "ACK" }   │
//!   │ ────────────────────────────────────────────► │  session key generated
//!   │                                               │  at accept time
//!   │  Handshake { public_key: server_pk,           │
//!   │              blob: RSA(client_pk, key), "ACK" }│
//!   │ ◄──────────────────────────────────────────── │
//!   │                                               │
//!   │  Data { AES-GCM(key, body) }                  │
//!   │ ◄════════════════════════════════════════════►│
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL cryptographic code uses RustCrypto implementations
//! - NEVER implement custom crypto primitives
//! - Session keys MUST stay zeroize-on-drop
//! - Wire format changes require a `PROTOCOL_VERSION` bump
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;

// Re-export commonly used items
pub use crypto::{
    decrypt_symmetric, decrypt_with_private_key, encrypt_symmetric, encrypt_with_public_key,
    PublicKey, RsaKeyPair, SessionKey,
};
pub use error::{CoreError, Result};
pub use protocol::{
    Message, MessageKind, ProtocolCodec, ACK_OK, HANDSHAKE_MARKER, MAX_FRAME_SIZE, PROTOCOL_VERSION,
};

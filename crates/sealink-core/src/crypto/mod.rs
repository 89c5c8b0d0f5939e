// ============================================
// File: crates/sealink-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Centralizes all cryptographic operations for SeaLink behind a small
//! adapter surface, using audited RustCrypto implementations.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`keys`]: RSA keypairs, public keys, session keys
//! - [`asymmetric`]: RSA-OAEP encryption of key-sized blobs
//! - [`symmetric`]: AES-256-GCM encryption of application bodies
//!
//! ## Cryptographic Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Handshake Phase                          │
//! │                                                             │
//! │   SessionKey (32 random bytes, server side)                 │
//! │        │                                                    │
//! │        ▼                                                    │
//! │   RSA-OAEP-SHA256(client public key) ──► session_key_blob   │
//! └─────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Transport Phase                          │
//! │                                                             │
//! │   nonce (12 random bytes) || AES-256-GCM(SessionKey, body)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - RSA is only ever applied to session keys, never to bodies
//! - Nonces are random per message; a session key is never used
//!   for anywhere near 2^32 messages on one connection
//!
//! ## Last Modified
//! v0.1.0 - Initial crypto implementation

pub mod asymmetric;
pub mod keys;
pub mod symmetric;

// Re-export primary types at module level
pub use asymmetric::{
    decrypt_with_private_key, encrypt_with_public_key, unwrap_session_key, wrap_session_key,
};
pub use keys::{PublicKey, RsaKeyPair, SessionKey};
pub use symmetric::{decrypt_symmetric, encrypt_symmetric, AesGcmCipher, PayloadCipher};

// ============================================
// Constants
// ============================================

/// Smallest accepted RSA modulus size in bits.
pub const MIN_RSA_BITS: usize = 2048;

/// Default RSA modulus size in bits.
pub const DEFAULT_RSA_BITS: usize = 3072;

/// Size of the symmetric session key in bytes (AES-256).
pub const SESSION_KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const AES_GCM_NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const AES_GCM_TAG_SIZE: usize = 16;

/// Hash output size used by OAEP (SHA-256).
pub const OAEP_HASH_SIZE: usize = 32;

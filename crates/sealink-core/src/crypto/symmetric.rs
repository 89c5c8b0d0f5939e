// ============================================
// File: crates/sealink-core/src/crypto/symmetric.rs
// ============================================
//! # Payload Encryption
//!
//! ## Creation Reason
//! Provides authenticated encryption for application bodies once a
//! session key has been negotiated.
//!
//! ## Main Functionality
//! - `PayloadCipher`: Trait for body encryption/decryption
//! - `AesGcmCipher`: Production implementation (AES-256-GCM)
//! - `encrypt_symmetric` / `decrypt_symmetric`: Convenience functions
//!
//! ## Ciphertext Format
//! ```text
//! ┌──────────────────────────────┐
//! │ Nonce (12 bytes, random)     │
//! ├──────────────────────────────┤
//! │ AES-256-GCM ciphertext       │
//! │ └─ GCM Tag (16 bytes)        │
//! └──────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never reuse a (key, nonce) pair
//! - Decryption errors must be surfaced, never replaced by the input bytes
//!
//! ## Last Modified
//! v0.1.0 - Initial AES-GCM implementation

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use super::{AES_GCM_NONCE_SIZE, AES_GCM_TAG_SIZE};
use crate::crypto::keys::SessionKey;
use crate::error::{CoreError, Result};

// ============================================
// PayloadCipher Trait
// ============================================

/// Trait for session-key encryption of application bodies.
///
/// # Purpose
/// Keeps the AEAD choice behind one seam so that the handshake and
/// framing code never depend on a specific cipher.
pub trait PayloadCipher: Send + Sync {
    /// Encrypts `plaintext`, returning a self-contained ciphertext.
    ///
    /// # Errors
    /// - `Encryption`: If the primitive fails
    fn seal(&self, key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts a ciphertext produced by [`PayloadCipher::seal`].
    ///
    /// # Errors
    /// - `Decryption`: If authentication fails (tampered or wrong key)
    fn open(&self, key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Returns the number of bytes `seal` adds to a plaintext.
    fn overhead(&self) -> usize;
}

// ============================================
// AesGcmCipher
// ============================================

/// AES-256-GCM with a random 96-bit nonce prepended to each ciphertext.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesGcmCipher;

impl AesGcmCipher {
    /// Creates a new instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn cipher(key: &SessionKey) -> Aes256Gcm {
        Aes256Gcm::new(key.as_bytes().into())
    }
}

impl PayloadCipher for AesGcmCipher {
    fn seal(&self, key: &SessionKey, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; AES_GCM_NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = Self::cipher(key)
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CoreError::encryption("AES-256-GCM encryption failed"))?;

        let mut output = Vec::with_capacity(AES_GCM_NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    fn open(&self, key: &SessionKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < AES_GCM_NONCE_SIZE + AES_GCM_TAG_SIZE {
            return Err(CoreError::Decryption);
        }

        let (nonce, sealed) = ciphertext.split_at(AES_GCM_NONCE_SIZE);
        Self::cipher(key)
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::Decryption)
    }

    fn overhead(&self) -> usize {
        AES_GCM_NONCE_SIZE + AES_GCM_TAG_SIZE
    }
}

// ============================================
// Convenience Functions
// ============================================

/// Encrypts a body with the default payload cipher.
///
/// # Errors
/// See [`PayloadCipher::seal`].
pub fn encrypt_symmetric(plaintext: &[u8], key: &SessionKey) -> Result<Vec<u8>> {
    AesGcmCipher::new().seal(key, plaintext)
}

/// Decrypts a body with the default payload cipher.
///
/// # Errors
/// See [`PayloadCipher::open`].
pub fn decrypt_symmetric(ciphertext: &[u8], key: &SessionKey) -> Result<Vec<u8>> {
    AesGcmCipher::new().open(key, ciphertext)
}

// ============================================
// Tests
// ============================================

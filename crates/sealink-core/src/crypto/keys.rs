// ============================================
// File: crates/sealink-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the key types used by the handshake and transport phases with
//! proper hygiene (zeroize on drop, redacted `Debug`).
//!
//! ## Main Functionality
//! - `RsaKeyPair`: Long-lived RSA keypair, generated lazily once per endpoint
//! - `PublicKey`: RSA public key as carried in handshake messages
//! - `SessionKey`: Per-connection AES-256 key
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  RsaKeyPair (per endpoint)                                 │
//! │  ├─ Generated on first secure open / server open           │
//! │  ├─ Kept across close/reopen                               │
//! │  └─ Public half travels in Handshake messages (PKCS#1 DER) │
//! │                                                            │
//! │  SessionKey (per TCP connection)                           │
//! │  ├─ Generated by the server when the connection is accepted│
//! │  ├─ Travels RSA-encrypted to the client                    │
//! │  └─ Dropped (and zeroized) when the connection ends        │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Private keys and session keys must never be logged
//! - Use `fingerprint()` when a public key needs to appear in logs
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{MIN_RSA_BITS, OAEP_HASH_SIZE, SESSION_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// RsaKeyPair
// ============================================

/// RSA keypair owned by a client or server endpoint.
///
/// # Security
/// - Generated from the OS random number generator
/// - The private half is zeroized by `rsa` on drop
#[derive(Clone)]
pub struct RsaKeyPair {
    private: RsaPrivateKey,
    public: PublicKey,
}

impl RsaKeyPair {
    /// Generates a new keypair with a modulus of `bits` bits.
    ///
    /// # Errors
    /// `KeyGeneration` if `bits` is below [`MIN_RSA_BITS`] or the
    /// underlying generator fails.
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(CoreError::key_generation(format!(
                "RSA modulus of {} bits is below the minimum of {}",
                bits, MIN_RSA_BITS
            )));
        }

        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| CoreError::key_generation(format!("RSA-{}: {}", bits, e)))?;
        let public = PublicKey(RsaPublicKey::from(&private));

        Ok(Self { private, public })
    }

    /// Returns the public half.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Returns the modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.public.bits()
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .finish()
    }
}

// ============================================
// PublicKey
// ============================================

/// RSA public key as exchanged during the handshake.
///
/// The wire representation is PKCS#1 DER.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Encodes the key as PKCS#1 DER.
    ///
    /// # Errors
    /// `InvalidKey` if the key cannot be encoded.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.0
            .to_pkcs1_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| CoreError::invalid_key(e.to_string()))
    }

    /// Parses a PKCS#1 DER encoded key.
    ///
    /// # Errors
    /// `InvalidKey` if the bytes are not a valid RSA public key.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        RsaPublicKey::from_pkcs1_der(der)
            .map(Self)
            .map_err(|e| CoreError::invalid_key(e.to_string()))
    }

    /// Returns the modulus size in bits.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.0.size() * 8
    }

    /// Largest plaintext this key can encrypt with OAEP-SHA256.
    #[must_use]
    pub fn max_oaep_plaintext(&self) -> usize {
        self.0.size().saturating_sub(2 * OAEP_HASH_SIZE + 2)
    }

    /// Short printable fingerprint: base64 of the first 8 bytes of SHA-256(DER).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let der = self.to_der().unwrap_or_default();
        let digest = Sha256::digest(&der);
        BASE64.encode(&digest[..8])
    }

    pub(crate) fn inner(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(rsa-{}, {})", self.bits(), self.fingerprint())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

// ============================================
// SessionKey
// ============================================

/// Symmetric key shared by both ends of one connection.
///
/// # Security
/// - Zeroized on drop
/// - `Debug` never prints key material
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Generates a fresh random key from the OS generator.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; SESSION_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Creates a session key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; SESSION_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Creates a session key from a slice, checking its length.
    ///
    /// # Errors
    /// `InvalidKey` if `bytes` is not exactly [`SESSION_KEY_SIZE`] long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SESSION_KEY_SIZE {
            return Err(CoreError::invalid_key(format!(
                "session key must be {} bytes, got {}",
                SESSION_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; SESSION_KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Returns the raw key bytes.
    ///
    /// # Security Warning
    /// Do not log or persist the returned bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey([REDACTED])")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SessionKey {}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;

    static KEYPAIR: Lazy<RsaKeyPair> = Lazy::new(|| RsaKeyPair::generate(MIN_RSA_BITS).unwrap());

    #[test]
    fn test_generate_rejects_small_modulus() {
        let result = RsaKeyPair::generate(1024);
        assert!(matches!(result, Err(CoreError::KeyGeneration { .. })));
    }

    #[test]
    fn test_generated_key_size() {
        assert_eq!(KEYPAIR.bits(), MIN_RSA_BITS);
        assert_eq!(KEYPAIR.public_key().max_oaep_plaintext(), 256 - 66);
    }

    #[test]
    fn test_public_key_der_roundtrip() {
        let der = KEYPAIR.public_key().to_der().unwrap();
        let parsed = PublicKey::from_der(&der).unwrap();
        assert_eq!(&parsed, KEYPAIR.public_key());
        assert_eq!(parsed.fingerprint(), KEYPAIR.public_key().fingerprint());
    }

    #[test]
    fn test_public_key_rejects_garbage() {
        assert!(matches!(
            PublicKey::from_der(b"definitely not DER"),
            Err(CoreError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let debug = format!("{:?}", *KEYPAIR);
        assert!(debug.contains("REDACTED"));

        let key = SessionKey::from_bytes([0x42; SESSION_KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "SessionKey([REDACTED])");
    }

    #[test]
    fn test_session_keys_are_random() {
        let a = SessionKey::generate();
        let b = SessionKey::generate();
        assert_ne!(a, b);
        assert_ne!(a.as_bytes(), &[0u8; SESSION_KEY_SIZE]);
    }

    #[test]
    fn test_session_key_from_slice_checks_length() {
        assert!(SessionKey::from_slice(&[1u8; SESSION_KEY_SIZE]).is_ok());
        assert!(SessionKey::from_slice(&[1u8; 16]).is_err());
    }
}

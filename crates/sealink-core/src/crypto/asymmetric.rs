// ============================================
// File: crates/sealink-core/src/crypto/asymmetric.rs
// ============================================
//! # Asymmetric Encryption
//!
//! ## Creation Reason
//! Transports the server-generated session key to the client, encrypted
//! under the client's RSA public key.
//!
//! ## Main Functionality
//! - `encrypt_with_public_key` / `decrypt_with_private_key`: RSA-OAEP (SHA-256)
//! - `wrap_session_key` / `unwrap_session_key`: the same, typed for `SessionKey`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only key-sized blobs go through RSA; bodies use [`super::symmetric`]
//! - Decryption failures collapse to `CoreError::Decryption` on purpose
//!
//! ## Last Modified
//! v0.1.0 - Initial RSA-OAEP helpers

use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::crypto::keys::{PublicKey, RsaKeyPair, SessionKey};
use crate::error::{CoreError, Result};

/// Encrypts a small blob under `key` with RSA-OAEP-SHA256.
///
/// # Errors
/// `Encryption` if the blob is larger than the key can carry or the
/// primitive fails.
pub fn encrypt_with_public_key(plaintext: &[u8], key: &PublicKey) -> Result<Vec<u8>> {
    let max = key.max_oaep_plaintext();
    if plaintext.len() > max {
        return Err(CoreError::encryption(format!(
            "RSA-OAEP payload of {} bytes exceeds the {} byte limit",
            plaintext.len(),
            max
        )));
    }

    key.inner()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|e| CoreError::encryption(format!("RSA-OAEP: {}", e)))
}

/// Decrypts an RSA-OAEP-SHA256 blob with the private half of `keypair`.
///
/// # Errors
/// `Decryption` on any failure (wrong key, tampering, bad padding).
pub fn decrypt_with_private_key(ciphertext: &[u8], keypair: &RsaKeyPair) -> Result<Vec<u8>> {
    keypair
        .private_key()
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| CoreError::Decryption)
}

/// Encrypts `session_key` for the holder of `recipient`.
///
/// # Errors
/// See [`encrypt_with_public_key`].
pub fn wrap_session_key(session_key: &SessionKey, recipient: &PublicKey) -> Result<Vec<u8>> {
    encrypt_with_public_key(session_key.as_bytes(), recipient)
}

/// Recovers a session key wrapped with [`wrap_session_key`].
///
/// # Errors
/// `Decryption` if the blob does not decrypt, `InvalidKey` if the
/// recovered key has the wrong length.
pub fn unwrap_session_key(blob: &[u8], keypair: &RsaKeyPair) -> Result<SessionKey> {
    let mut raw = decrypt_with_private_key(blob, keypair)?;
    let key = SessionKey::from_slice(&raw);
    raw.zeroize();
    key
}

// ============================================
// Tests
// ============================================

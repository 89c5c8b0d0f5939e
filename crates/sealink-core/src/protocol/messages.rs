// ============================================
// File: crates/sealink-core/src/protocol/messages.rs
// ============================================
//! # Protocol Message Definitions
//!
//! ## Creation Reason
//! Defines the single envelope type exchanged between SeaLink clients and
//! servers.
//!
//! ## Main Functionality
//! - `MessageKind`: Explicit tag identifying handshake, data and error frames
//! - `Message`: Envelope carrying optional key material and an opaque body
//!
//! ## Envelope Rules
//! | Kind | public_key | session_key_blob | body |
//! |------|------------|------------------|------|
//! | Handshake (client) | client key if secure | - | `"ACK"` |
//! | Handshake (server) | server key | wrapped key if client key known | `"ACK"` |
//! | Data | - | - | payload (encrypted when keyed) |
//! | Error | - | - | clear-text reason |
//!
//! ## ⚠️ Important Note for Next Developer
//! - A blob without a public key is never well-formed
//! - Add new kinds at the end to keep tags stable
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use bytes::Bytes;

use super::HANDSHAKE_MARKER;
use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};

// ============================================
// MessageKind
// ============================================

/// Message kind tag.
///
/// # Values
/// | Value | Kind |
/// |-------|------|
/// | 0x01 | Handshake |
/// | 0x02 | Data |
/// | 0x03 | Error |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Key exchange message, sent once in each direction.
    Handshake = 0x01,
    /// Application payload.
    Data = 0x02,
    /// Server-side rejection of an exchange, body is a reason string.
    Error = 0x03,
}

impl MessageKind {
    /// Converts a byte to a `MessageKind`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Handshake),
            0x02 => Some(Self::Data),
            0x03 => Some(Self::Error),
            _ => None,
        }
    }

    /// Parses a tag byte, failing with `UnknownMessageKind`.
    pub fn parse(byte: u8) -> Result<Self> {
        Self::from_byte(byte).ok_or(CoreError::UnknownMessageKind(byte))
    }

    /// Converts the kind to its byte representation.
    #[must_use]
    pub const fn as_byte(&self) -> u8 {
        *self as u8
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        kind.as_byte()
    }
}

// ============================================
// Message
// ============================================

/// Envelope exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// What this message is.
    pub kind: MessageKind,
    /// RSA public key of the sender, handshake only.
    pub public_key: Option<PublicKey>,
    /// Session key RSA-encrypted for the receiver, handshake response only.
    pub session_key_blob: Option<Bytes>,
    /// Opaque payload.
    pub body: Bytes,
}

impl Message {
    /// Builds a client handshake carrying `public_key` when running secure.
    #[must_use]
    pub fn handshake(public_key: Option<PublicKey>) -> Self {
        Self {
            kind: MessageKind::Handshake,
            public_key,
            session_key_blob: None,
            body: Bytes::from_static(HANDSHAKE_MARKER),
        }
    }

    /// Builds the server's handshake response.
    #[must_use]
    pub fn handshake_ack(server_key: PublicKey, session_key_blob: Option<Bytes>) -> Self {
        Self {
            kind: MessageKind::Handshake,
            public_key: Some(server_key),
            session_key_blob,
            body: Bytes::from_static(HANDSHAKE_MARKER),
        }
    }

    /// Builds a data message.
    #[must_use]
    pub fn data(body: impl Into<Bytes>) -> Self {
        Self {
            kind: MessageKind::Data,
            public_key: None,
            session_key_blob: None,
            body: body.into(),
        }
    }

    /// Builds an error message with a clear-text reason.
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            public_key: None,
            session_key_blob: None,
            body: Bytes::from(reason.into()),
        }
    }

    /// Returns `true` for handshake messages.
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        self.kind == MessageKind::Handshake
    }

    /// Returns the body of an error message as text.
    #[must_use]
    pub fn error_reason(&self) -> Option<String> {
        (self.kind == MessageKind::Error).then(|| String::from_utf8_lossy(&self.body).into_owned())
    }

    /// Checks the envelope invariants.
    ///
    /// # Errors
    /// `Malformed` if a session key blob is present without a public key.
    pub fn validate(&self) -> Result<()> {
        if self.session_key_blob.is_some() && self.public_key.is_none() {
            return Err(CoreError::malformed("session key blob without public key"));
        }
        Ok(())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{RsaKeyPair, MIN_RSA_BITS};
    use once_cell::sync::Lazy;

    static KEYPAIR: Lazy<RsaKeyPair> = Lazy::new(|| RsaKeyPair::generate(MIN_RSA_BITS).unwrap());

    #[test]
    fn test_message_kind_conversion() {
        for kind in [MessageKind::Handshake, MessageKind::Data, MessageKind::Error] {
            assert_eq!(MessageKind::parse(kind.as_byte()).unwrap(), kind);
        }
        assert!(matches!(
            MessageKind::parse(0x7F),
            Err(CoreError::UnknownMessageKind(0x7F))
        ));
    }

    #[test]
    fn test_handshake_constructors() {
        let hello = Message::handshake(None);
        assert!(hello.is_handshake());
        assert_eq!(&hello.body[..], HANDSHAKE_MARKER);
        assert!(hello.validate().is_ok());

        let ack = Message::handshake_ack(
            KEYPAIR.public_key().clone(),
            Some(Bytes::from_static(b"blob")),
        );
        assert!(ack.validate().is_ok());
        assert_eq!(ack.public_key.as_ref(), Some(KEYPAIR.public_key()));
    }

    #[test]
    fn test_blob_requires_public_key() {
        let mut msg = Message::data("payload");
        msg.session_key_blob = Some(Bytes::from_static(b"blob"));
        assert!(matches!(msg.validate(), Err(CoreError::Malformed { .. })));
    }

    #[test]
    fn test_error_reason() {
        let msg = Message::error("decryption failed");
        assert_eq!(msg.kind, MessageKind::Error);
        assert_eq!(msg.error_reason().as_deref(), Some("decryption failed"));
        assert_eq!(Message::data("x").error_reason(), None);
    }
}

// ============================================
// File: crates/sealink-core/src/protocol/codec.rs
// ============================================
//! # Protocol Codec
//!
//! ## Creation Reason
//! Provides binary serialization and deserialization of [`Message`]
//! envelopes for a streaming transport.
//!
//! ## Main Functionality
//! - `ProtocolCodec`: Frame encoder/decoder
//! - `encode` / `decode_frame`: Convenience functions over `BytesMut`
//!
//! ## Wire Format (little-endian)
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ frame_len (u32)  bytes after this field    │
//! ├────────────────────────────────────────────┤
//! │ version (u8)                               │
//! │ kind    (u8)                               │
//! │ flags   (u8)  bit0 = key, bit1 = blob      │
//! ├────────────────────────────────────────────┤
//! │ [u32 len | public key, PKCS#1 DER]         │
//! │ [u32 len | session key blob]               │
//! ├────────────────────────────────────────────┤
//! │ body (rest of frame)                       │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Parsing Strategy
//! 1. Wait for the 4-byte length prefix
//! 2. Reject lengths over `MAX_FRAME_SIZE` before buffering them
//! 3. Wait for the full frame, then split it off the buffer
//! 4. Validate version, kind, flags and field lengths
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always validate buffer lengths before reading
//! - Absent optional fields decode as `None`, never as empty bytes
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use super::messages::{Message, MessageKind};
use super::{MAX_FRAME_SIZE, PROTOCOL_VERSION};
use crate::crypto::PublicKey;
use crate::error::{CoreError, Result};

// ============================================
// Layout Constants
// ============================================

/// Size of the frame length prefix.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the fixed header following the length prefix.
pub const FRAME_HEADER_SIZE: usize = 3;

/// Flag bit: public key field present.
pub const FLAG_PUBLIC_KEY: u8 = 0b0000_0001;

/// Flag bit: session key blob field present.
pub const FLAG_SESSION_KEY_BLOB: u8 = 0b0000_0010;

const KNOWN_FLAGS: u8 = FLAG_PUBLIC_KEY | FLAG_SESSION_KEY_BLOB;

// ============================================
// ProtocolCodec
// ============================================

/// Codec for SeaLink frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolCodec;

impl ProtocolCodec {
    /// Creates a new protocol codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks if the buffer starts with a complete frame.
    ///
    /// # Returns
    /// - `Ok(Some(len))` - Complete frame of `len` bytes, prefix included
    /// - `Ok(None)` - Incomplete frame, need more data
    /// - `Err(_)` - Declared length is out of bounds
    pub fn check_complete(buf: &[u8]) -> Result<Option<usize>> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&buf[..LENGTH_PREFIX_SIZE]);
        let frame_len = u32::from_le_bytes(prefix) as usize;

        if frame_len > MAX_FRAME_SIZE {
            return Err(CoreError::too_large(MAX_FRAME_SIZE, frame_len));
        }
        if frame_len < FRAME_HEADER_SIZE {
            return Err(CoreError::too_short(FRAME_HEADER_SIZE, frame_len));
        }

        let total = LENGTH_PREFIX_SIZE + frame_len;
        Ok((buf.len() >= total).then_some(total))
    }

    /// Appends one encoded frame to `buf`.
    ///
    /// # Errors
    /// - `Malformed`: The message violates envelope invariants
    /// - `MessageTooLarge`: The frame would exceed `MAX_FRAME_SIZE`
    /// - `InvalidKey`: The public key cannot be DER-encoded
    pub fn encode(&self, msg: &Message, buf: &mut BytesMut) -> Result<()> {
        msg.validate()?;

        let der = msg.public_key.as_ref().map(PublicKey::to_der).transpose()?;

        let mut flags = 0u8;
        let mut frame_len = FRAME_HEADER_SIZE + msg.body.len();
        if let Some(der) = &der {
            flags |= FLAG_PUBLIC_KEY;
            frame_len += LENGTH_PREFIX_SIZE + der.len();
        }
        if let Some(blob) = &msg.session_key_blob {
            flags |= FLAG_SESSION_KEY_BLOB;
            frame_len += LENGTH_PREFIX_SIZE + blob.len();
        }

        if frame_len > MAX_FRAME_SIZE {
            return Err(CoreError::too_large(MAX_FRAME_SIZE, frame_len));
        }

        buf.reserve(LENGTH_PREFIX_SIZE + frame_len);
        buf.put_u32_le(frame_len as u32);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(msg.kind.as_byte());
        buf.put_u8(flags);
        if let Some(der) = &der {
            buf.put_u32_le(der.len() as u32);
            buf.put_slice(der);
        }
        if let Some(blob) = &msg.session_key_blob {
            buf.put_u32_le(blob.len() as u32);
            buf.put_slice(blob);
        }
        buf.put_slice(&msg.body);

        trace!(kind = ?msg.kind, flags, frame_len, "Encoded frame");
        Ok(())
    }

    /// Removes one complete frame from the front of `buf` and decodes it.
    ///
    /// Returns `Ok(None)` and leaves `buf` untouched if the frame is not
    /// complete yet.
    ///
    /// # Errors
    /// Any framing or envelope violation. The offending frame has been
    /// consumed when the error comes from its contents.
    pub fn decode(&self, buf: &mut BytesMut) -> Result<Option<Message>> {
        let Some(total) = Self::check_complete(buf)? else {
            return Ok(None);
        };

        let mut frame = buf.split_to(total).freeze();
        frame.advance(LENGTH_PREFIX_SIZE);
        Self::parse_frame(frame).map(Some)
    }

    fn parse_frame(mut frame: Bytes) -> Result<Message> {
        let frame_len = frame.len();
        if frame_len < FRAME_HEADER_SIZE {
            return Err(CoreError::too_short(FRAME_HEADER_SIZE, frame_len));
        }

        let version = frame.get_u8();
        if version != PROTOCOL_VERSION {
            return Err(CoreError::UnsupportedVersion {
                got: version,
                expected: PROTOCOL_VERSION,
            });
        }

        let kind = MessageKind::parse(frame.get_u8())?;

        let flags = frame.get_u8();
        if flags & !KNOWN_FLAGS != 0 {
            return Err(CoreError::malformed(format!(
                "reserved flag bits set: 0b{:08b}",
                flags
            )));
        }

        let public_key = if flags & FLAG_PUBLIC_KEY != 0 {
            let der = read_field(&mut frame, "public key")?;
            let key = PublicKey::from_der(&der)
                .map_err(|_| CoreError::malformed("public key is not valid PKCS#1 DER"))?;
            Some(key)
        } else {
            None
        };

        let session_key_blob = if flags & FLAG_SESSION_KEY_BLOB != 0 {
            Some(read_field(&mut frame, "session key blob")?)
        } else {
            None
        };

        let msg = Message {
            kind,
            public_key,
            session_key_blob,
            body: frame,
        };
        msg.validate()?;

        trace!(kind = ?msg.kind, flags, frame_len, "Decoded frame");
        Ok(msg)
    }
}

fn read_field(frame: &mut Bytes, what: &str) -> Result<Bytes> {
    if frame.remaining() < LENGTH_PREFIX_SIZE {
        return Err(CoreError::malformed(format!("{} length truncated", what)));
    }
    let len = frame.get_u32_le() as usize;
    if frame.remaining() < len {
        return Err(CoreError::malformed(format!(
            "{} declares {} bytes, only {} remain",
            what,
            len,
            frame.remaining()
        )));
    }
    Ok(frame.split_to(len))
}

// ============================================
// Convenience Functions
// ============================================

/// Appends `msg` to `buf` as one frame.
///
/// # Errors
/// See [`ProtocolCodec::encode`].
pub fn encode(msg: &Message, buf: &mut BytesMut) -> Result<()> {
    ProtocolCodec.encode(msg, buf)
}

/// Consumes one complete frame from `buf`, if there is one.
///
/// # Errors
/// See [`ProtocolCodec::decode`].
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Message>> {
    ProtocolCodec.decode(buf)
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{RsaKeyPair, MIN_RSA_BITS};
    use crate::protocol::HANDSHAKE_MARKER;
    use once_cell::sync::Lazy;

    static KEYPAIR: Lazy<RsaKeyPair> = Lazy::new(|| RsaKeyPair::generate(MIN_RSA_BITS).unwrap());

    fn encoded(msg: &Message) -> BytesMut {
        let mut buf = BytesMut::new();
        encode(msg, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_data_frame_layout() {
        let buf = encoded(&Message::data("ping"));

        assert_eq!(&buf[..4], &7u32.to_le_bytes());
        assert_eq!(buf[4], PROTOCOL_VERSION);
        assert_eq!(buf[5], MessageKind::Data.as_byte());
        assert_eq!(buf[6], 0);
        assert_eq!(&buf[7..], b"ping");
    }

    #[test]
    fn test_handshake_ack_roundtrip() {
        let original = Message::handshake_ack(
            KEYPAIR.public_key().clone(),
            Some(Bytes::from(vec![0xAB; 256])),
        );
        let mut buf = encoded(&original);
        assert_eq!(buf[6], FLAG_PUBLIC_KEY | FLAG_SESSION_KEY_BLOB);

        let decoded = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, original);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_absent_fields_decode_as_none() {
        let mut buf = encoded(&Message::handshake(None));
        let decoded = decode_frame(&mut buf).unwrap().unwrap();

        assert_eq!(decoded.kind, MessageKind::Handshake);
        assert!(decoded.public_key.is_none());
        assert!(decoded.session_key_blob.is_none());
        assert_eq!(&decoded.body[..], HANDSHAKE_MARKER);
    }

    #[test]
    fn test_partial_input_returns_none() {
        let full = encoded(&Message::data("hello world"));

        for cut in [0, 3, 4, 8, full.len() - 1] {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(decode_frame(&mut partial).unwrap().is_none());
            assert_eq!(partial.len(), cut);
        }
    }

    #[test]
    fn test_decode_consumes_exactly_one_frame() {
        let mut buf = encoded(&Message::data("first"));
        buf.extend_from_slice(&encoded(&Message::data("second")));
        buf.extend_from_slice(&[0x10, 0x00]);

        let first = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(&first.body[..], b"first");
        let second = decode_frame(&mut buf).unwrap().unwrap();
        assert_eq!(&second.body[..], b"second");
        assert!(decode_frame(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], &[0x10, 0x00]);
    }

    #[test]
    fn test_check_complete() {
        assert_eq!(ProtocolCodec::check_complete(&[]).unwrap(), None);

        let frame = encoded(&Message::data("abc"));
        assert_eq!(
            ProtocolCodec::check_complete(&frame).unwrap(),
            Some(frame.len())
        );
        assert_eq!(
            ProtocolCodec::check_complete(&frame[..frame.len() - 1]).unwrap(),
            None
        );
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le((MAX_FRAME_SIZE + 1) as u32);
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::MessageTooLarge { .. })
        ));

        let huge = Message::data(vec![0u8; MAX_FRAME_SIZE]);
        let mut out = BytesMut::new();
        assert!(matches!(
            encode(&huge, &mut out),
            Err(CoreError::MessageTooLarge { .. })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_unknown_kind_and_version_rejected() {
        let mut buf = encoded(&Message::data("x"));
        buf[5] = 0x7F;
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::UnknownMessageKind(0x7F))
        ));

        let mut buf = encoded(&Message::data("x"));
        buf[4] = 9;
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::UnsupportedVersion { got: 9, .. })
        ));
    }

    #[test]
    fn test_reserved_flags_rejected() {
        let mut buf = encoded(&Message::data("x"));
        buf[6] = 0b1000_0000;
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_blob_without_key_rejected() {
        let mut invalid = Message::data("x");
        invalid.session_key_blob = Some(Bytes::from_static(b"blob"));
        let mut out = BytesMut::new();
        assert!(matches!(
            encode(&invalid, &mut out),
            Err(CoreError::Malformed { .. })
        ));

        // Hand-built frame: blob flag without key flag
        let mut buf = BytesMut::new();
        buf.put_u32_le(3 + 4 + 4);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(MessageKind::Data.as_byte());
        buf.put_u8(FLAG_SESSION_KEY_BLOB);
        buf.put_u32_le(4);
        buf.put_slice(b"blob");
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_truncated_field_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(3 + 4 + 2);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(MessageKind::Handshake.as_byte());
        buf.put_u8(FLAG_PUBLIC_KEY);
        buf.put_u32_le(500);
        buf.put_slice(b"xx");
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::Malformed { .. })
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_invalid_der_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(3 + 4 + 5);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u8(MessageKind::Handshake.as_byte());
        buf.put_u8(FLAG_PUBLIC_KEY);
        buf.put_u32_le(5);
        buf.put_slice(b"notpk");
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_undersized_length_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(2);
        buf.put_slice(&[1, 2]);
        assert!(matches!(
            decode_frame(&mut buf),
            Err(CoreError::MessageTooShort { .. })
        ));
    }
}

// ============================================
// File: crates/sealink-server/src/services/handshake.rs
// ============================================
//! # Handshake Service
//!
//! ## Creation Reason
//! Answers client handshakes, delivering the connection's session key
//! encrypted under the client's RSA public key.
//!
//! ## Handshake Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    HandshakeService                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  1. Receive Handshake { client_pk? }                         │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  2. client_pk present?                                       │
//! │     ├─ yes: check size, RSA-OAEP wrap the session key        │
//! │     └─ no:  connection stays in clear mode                   │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  3. Record client_pk on the session                          │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  4. Return Handshake { server_pk, blob?, "ACK" }             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Handling
//! - Undersized or unusable client keys: the session is left unchanged
//!   and the caller answers with an `Error` message
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake service

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use sealink_core::crypto::{wrap_session_key, RsaKeyPair, MIN_RSA_BITS};
use sealink_core::error::CoreError;
use sealink_core::protocol::Message;

use crate::error::Result;
use crate::services::registry::ClientSession;

/// Server side of the key exchange.
pub struct HandshakeService {
    keypair: Arc<RsaKeyPair>,
}

impl HandshakeService {
    pub fn new(keypair: Arc<RsaKeyPair>) -> Self {
        Self { keypair }
    }

    /// Processes a client handshake and builds the response.
    ///
    /// The session's client key is only updated once the response has been
    /// built successfully.
    pub fn process(&self, session: &ClientSession, hello: &Message) -> Result<Message> {
        debug!(
            peer = %session.id,
            client_key = ?hello.public_key,
            "Processing handshake"
        );

        let blob = match &hello.public_key {
            Some(client_key) => {
                if client_key.bits() < MIN_RSA_BITS {
                    warn!(
                        peer = %session.id,
                        bits = client_key.bits(),
                        "Client key below minimum size"
                    );
                    return Err(CoreError::invalid_key(format!(
                        "client key of {} bits is below the minimum of {}",
                        client_key.bits(),
                        MIN_RSA_BITS
                    ))
                    .into());
                }
                let wrapped = wrap_session_key(session.session_key(), client_key)?;
                Some(Bytes::from(wrapped))
            }
            None => None,
        };

        session.set_public_key(hello.public_key.clone());

        debug!(
            peer = %session.id,
            secured = blob.is_some(),
            "Handshake complete"
        );

        Ok(Message::handshake_ack(
            self.keypair.public_key().clone(),
            blob,
        ))
    }

    #[must_use]
    pub fn keypair(&self) -> &RsaKeyPair {
        &self.keypair
    }
}

impl std::fmt::Debug for HandshakeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeService")
            .field("server_key", self.keypair.public_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use sealink_core::crypto::unwrap_session_key;
    use sealink_core::protocol::{MessageKind, HANDSHAKE_MARKER};

    static SERVER: Lazy<Arc<RsaKeyPair>> =
        Lazy::new(|| Arc::new(RsaKeyPair::generate(MIN_RSA_BITS).unwrap()));
    static CLIENT: Lazy<RsaKeyPair> = Lazy::new(|| RsaKeyPair::generate(MIN_RSA_BITS).unwrap());

    fn session() -> ClientSession {
        ClientSession::new("127.0.0.1:5555".parse().unwrap())
    }

    #[test]
    fn test_secure_handshake_delivers_session_key() {
        let service = HandshakeService::new(Arc::clone(&SERVER));
        let session = session();

        let reply = service
            .process(&session, &Message::handshake(Some(CLIENT.public_key().clone())))
            .unwrap();

        assert_eq!(reply.kind, MessageKind::Handshake);
        assert_eq!(&reply.body[..], HANDSHAKE_MARKER);
        assert_eq!(reply.public_key.as_ref(), Some(SERVER.public_key()));

        let blob = reply.session_key_blob.unwrap();
        let key = unwrap_session_key(&blob, &CLIENT).unwrap();
        assert_eq!(&key, session.session_key());
        assert!(session.is_secured());
    }

    #[test]
    fn test_plain_handshake_has_no_blob() {
        let service = HandshakeService::new(Arc::clone(&SERVER));
        let session = session();

        let reply = service.process(&session, &Message::handshake(None)).unwrap();

        assert!(reply.session_key_blob.is_none());
        assert_eq!(reply.public_key.as_ref(), Some(SERVER.public_key()));
        assert!(!session.is_secured());
    }
}

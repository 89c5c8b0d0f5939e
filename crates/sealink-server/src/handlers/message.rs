// ============================================
// File: crates/sealink-server/src/handlers/message.rs
// ============================================
//! # Message Handler
//!
//! ## Creation Reason
//! Turns an incoming `Data` message into a reply: decrypts the body when
//! the session is keyed, runs the application handler, and seals the
//! answer.
//!
//! ## Main Functionality
//! - `MessageHandler`: Application callback trait
//! - `MessageDispatcher`: Decrypt, dispatch, encrypt
//!
//! ## Data Processing
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. Session secured?                                        │
//! │     ├─ yes: open body with session key                      │
//! │     │        └─ failure: reply Error("decryption failed")   │
//! │     └─ no:  body used as-is                                 │
//! │                                                             │
//! │  2. Handler(plaintext message) → Option<body>               │
//! │     └─ None (or no handler): "true"                         │
//! │                                                             │
//! │  3. Secured? seal reply with session key                    │
//! │                                                             │
//! │  4. Reply Data(body)                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The handler never sees ciphertext
//! - A decryption failure never reaches the handler
//!
//! ## Last Modified
//! v0.1.0 - Initial message handler

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, warn};

use sealink_core::crypto::{AesGcmCipher, PayloadCipher};
use sealink_core::protocol::{Message, ACK_OK};

use crate::services::ClientSession;

/// Reason sent back when a body fails authentication.
pub const DECRYPTION_FAILED: &str = "decryption failed";

/// Reason sent back when a reply cannot be sealed.
pub const ENCRYPTION_FAILED: &str = "encryption failed";

// ============================================
// MessageHandler
// ============================================

/// Application callback invoked once per `Data` message.
///
/// The message body is always plaintext. Returning `None` acknowledges
/// the message with `"true"`.
///
/// Plain closures work through a blanket implementation:
/// ```ignore
/// listener.on_message(|msg: &Message| Some(msg.body.clone()));
/// ```
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Option<Bytes>;
}

#[async_trait]
impl<F> MessageHandler for F
where
    F: Fn(&Message) -> Option<Bytes> + Send + Sync,
{
    async fn handle(&self, message: &Message) -> Option<Bytes> {
        (self)(message)
    }
}

// ============================================
// MessageDispatcher
// ============================================

/// Runs the application handler for one session's data messages.
#[derive(Default)]
pub struct MessageDispatcher {
    handler: RwLock<Option<Arc<dyn MessageHandler>>>,
    cipher: AesGcmCipher,
}

impl MessageDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler`, replacing any previous one.
    pub fn set_handler(&self, handler: Arc<dyn MessageHandler>) {
        *self.handler.write() = Some(handler);
    }

    #[must_use]
    pub fn has_handler(&self) -> bool {
        self.handler.read().is_some()
    }

    /// Builds the reply to a `Data` message received on `session`.
    pub async fn dispatch(&self, session: &ClientSession, request: Message) -> Message {
        let secured = session.is_secured();

        let body = if secured {
            match self.cipher.open(session.session_key(), &request.body) {
                Ok(plaintext) => Bytes::from(plaintext),
                Err(e) => {
                    session.stats.record_decrypt_failure();
                    warn!(peer = %session.id, error = %e, "Rejecting undecryptable message");
                    return Message::error(DECRYPTION_FAILED);
                }
            }
        } else {
            request.body
        };

        let plaintext = Message::data(body);
        let handler = self.handler.read().clone();
        let reply = match handler {
            Some(handler) => handler.handle(&plaintext).await,
            None => None,
        }
        .unwrap_or_else(|| Bytes::from_static(ACK_OK));

        debug!(
            peer = %session.id,
            request_len = plaintext.body.len(),
            reply_len = reply.len(),
            "Message handled"
        );

        if !secured {
            return Message::data(reply);
        }

        match self.cipher.seal(session.session_key(), &reply) {
            Ok(sealed) => Message::data(sealed),
            Err(e) => {
                warn!(peer = %session.id, error = %e, "Failed to seal reply");
                Message::error(ENCRYPTION_FAILED)
            }
        }
    }
}

impl std::fmt::Debug for MessageDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDispatcher")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use sealink_core::crypto::{decrypt_symmetric, encrypt_symmetric, RsaKeyPair, MIN_RSA_BITS};
    use sealink_core::protocol::MessageKind;

    static CLIENT: Lazy<RsaKeyPair> = Lazy::new(|| RsaKeyPair::generate(MIN_RSA_BITS).unwrap());

    fn plain_session() -> ClientSession {
        ClientSession::new("127.0.0.1:6000".parse().unwrap())
    }

    fn secured_session() -> ClientSession {
        let session = plain_session();
        session.set_public_key(Some(CLIENT.public_key().clone()));
        session
    }

    fn echo(msg: &Message) -> Option<Bytes> {
        Some(msg.body.clone())
    }

    #[tokio::test]
    async fn test_no_handler_acknowledges() {
        let dispatcher = MessageDispatcher::new();
        let reply = dispatcher.dispatch(&plain_session(), Message::data("ping")).await;

        assert_eq!(reply.kind, MessageKind::Data);
        assert_eq!(&reply.body[..], ACK_OK);
    }

    #[tokio::test]
    async fn test_handler_none_becomes_ack() {
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_handler(Arc::new(|_: &Message| -> Option<Bytes> { None }));

        let reply = dispatcher.dispatch(&plain_session(), Message::data("ping")).await;
        assert_eq!(&reply.body[..], ACK_OK);
    }

    #[tokio::test]
    async fn test_plain_echo() {
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_handler(Arc::new(echo));

        let reply = dispatcher.dispatch(&plain_session(), Message::data("ping")).await;
        assert_eq!(&reply.body[..], b"ping");
    }

    #[tokio::test]
    async fn test_secured_handler_sees_plaintext() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_handler(Arc::new(move |msg: &Message| -> Option<Bytes> {
            let _ = tx.send(msg.body.clone());
            Some(Bytes::from_static(b"world"))
        }));

        let session = secured_session();
        let sealed = encrypt_symmetric(b"hello", session.session_key()).unwrap();
        let reply = dispatcher.dispatch(&session, Message::data(sealed)).await;

        assert_eq!(&rx.recv().await.unwrap()[..], b"hello");
        assert_eq!(reply.kind, MessageKind::Data);
        assert_ne!(&reply.body[..], b"world");
        let opened = decrypt_symmetric(&reply.body, session.session_key()).unwrap();
        assert_eq!(opened, b"world");
    }

    #[tokio::test]
    async fn test_decryption_failure_skips_handler() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<()>();
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_handler(Arc::new(move |_: &Message| -> Option<Bytes> {
            let _ = tx.send(());
            None
        }));

        let session = secured_session();
        let reply = dispatcher
            .dispatch(&session, Message::data("not encrypted at all"))
            .await;

        assert_eq!(reply.error_reason().as_deref(), Some(DECRYPTION_FAILED));
        assert_eq!(session.stats.snapshot().decrypt_failures, 1);
        assert!(rx.try_recv().is_err());
    }
}

// ============================================
// File: crates/sealink-client/src/connection.rs
// ============================================
//! # Client Connection
//!
//! ## Creation Reason
//! The single request/response primitive of SeaLink: one persistent TCP
//! connection, an optional RSA handshake that delivers a session key, and
//! transparent AES-GCM protection of every body.
//!
//! ## Main Functionality
//! - `ClientConnection`: `open`, `send`, `close`, `is_open`, event hooks
//! - `ConnectionState`: Observable lifecycle state
//!
//! ## State Machine
//! ```text
//!           open()                dial ok            handshake ack
//! ┌──────┐ ───────► ┌────────────┐ ──────► ┌─────────────┐ ──────► ┌─────────┐
//! │ Idle │          │ Connecting │         │ Handshaking │         │ Secured │
//! └──────┘          └────────────┘         └─────────────┘         └────┬────┘
//!     ▲                   │ fail                  │ fail                │
//!     │                   ▼                       ▼                     │ send failure
//!     │              ┌────────────────────────────────┐                 │ or close()
//!     └── (never) ── │             Closed             │ ◄───────────────┘
//!                    └────────────────────────────────┘
//! ```
//!
//! ## Request Cycle
//! ```text
//! send(body)
//!   ├─ lock stream (one request in flight)
//!   ├─ close() since the call began? → ClientError::Closed
//!   ├─ no socket? reconnect (handshake again when secure)
//!   ├─ seal body with session key (if any)
//!   ├─ take socket out, write Data, read one reply under request_timeout
//!   │    ├─ reply read: socket goes back
//!   │    └─ failure or cancelled call: socket dropped, state Closed
//!   ├─ Error reply → ClientError::Rejected
//!   └─ open reply body with session key (if any)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The RSA keypair is generated once and survives close/reopen
//! - The session key is bound to one TCP connection on the server side,
//!   so a secure reconnect always runs a fresh handshake
//! - `close` interrupts a `send` blocked on its reply and fails the queued ones
//! - A socket with a request outstanding is never reused
//!
//! ## Last Modified
//! v0.1.0 - Initial client connection

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::{Notify, OnceCell};
use tracing::{debug, info, warn};

use sealink_common::{ClientId, ConnectionEvent, EventEmitter};
use sealink_core::crypto::{
    unwrap_session_key, AesGcmCipher, PayloadCipher, PublicKey, RsaKeyPair, SessionKey,
};
use sealink_core::protocol::{Message, MessageKind};
use sealink_transport::{dial, probe, FramedStream};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::prober::{Prober, ProberHandle};

type Stream = FramedStream<TcpStream>;

// ============================================
// ConnectionState
// ============================================

/// Lifecycle state of a `ClientConnection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, never opened.
    Idle,
    /// Dialing the server.
    Connecting,
    /// Waiting for the handshake response.
    Handshaking,
    /// Ready for `send`.
    Secured,
    /// Closed by the caller or after a failure.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Secured => "secured",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Key material learned from the last handshake.
#[derive(Default)]
struct Channel {
    server_key: Option<PublicKey>,
    session_key: Option<SessionKey>,
}

// ============================================
// ClientConnection
// ============================================

/// Persistent connection to a SeaLink server.
///
/// # Example
/// ```no_run
/// use sealink_client::{ClientConfig, ClientConnection};
///
/// # async fn run() -> sealink_client::Result<()> {
/// let client = ClientConnection::new(ClientConfig::new("127.0.0.1", 7300));
/// client.open().await?;
/// let reply = client.send("hello").await?;
/// println!("{:?}", reply);
/// client.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct ClientConnection {
    id: ClientId,
    config: ClientConfig,
    emitter: EventEmitter,
    cipher: AesGcmCipher,
    keypair: OnceCell<Arc<RsaKeyPair>>,
    stream: tokio::sync::Mutex<Option<Stream>>,
    state: RwLock<ConnectionState>,
    channel: RwLock<Channel>,
    prober: Mutex<Option<ProberHandle>>,
    closing: Notify,
    close_epoch: AtomicU64,
}

impl ClientConnection {
    /// Creates a connection with its own event emitter.
    ///
    /// The config is validated on every dial, so an invalid one surfaces
    /// as `ClientError::Config` from `open` or `send`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_emitter(config, EventEmitter::new())
    }

    /// Creates a connection that reports events through `emitter`.
    #[must_use]
    pub fn with_emitter(config: ClientConfig, emitter: EventEmitter) -> Self {
        Self {
            id: ClientId::derive(config.port),
            config,
            emitter,
            cipher: AesGcmCipher::new(),
            keypair: OnceCell::new(),
            stream: tokio::sync::Mutex::new(None),
            state: RwLock::new(ConnectionState::Idle),
            channel: RwLock::new(Channel::default()),
            prober: Mutex::new(None),
            closing: Notify::new(),
            close_epoch: AtomicU64::new(0),
        }
    }

    /// Connects and runs the handshake. No-op if already secured.
    ///
    /// On failure the connection is left `Closed`, so calling `open`
    /// again is safe.
    ///
    /// # Errors
    /// - `Config`: The configuration does not validate
    /// - `KeyGeneration`: The client keypair could not be created
    /// - `Dial` / `Timeout`: The server could not be reached
    /// - `Handshake`: The handshake response was unusable
    pub async fn open(&self) -> Result<()> {
        let mut slot = self.stream.lock().await;
        if slot.is_some() && self.state() == ConnectionState::Secured {
            return Ok(());
        }

        self.config.validate()?;
        if self.config.secure {
            self.keypair().await?;
        }
        if self.config.enable_ping {
            self.start_prober();
        }
        if slot.is_none() {
            self.reset(&mut slot).await;
        }

        self.connect(&mut slot, true).await
    }

    /// Sends `body` and returns the server's reply body.
    ///
    /// Calls are serialized: one request is in flight at a time. If the
    /// socket was dropped by an earlier failure the connection redials
    /// first.
    ///
    /// # Errors
    /// - `Rejected`: The server answered with an `Error` message
    /// - `Timeout`: No reply within `request_timeout`
    /// - `Closed`: `close` was called while this call was waiting
    /// - `Encode` / `Decode` / `Transport`: Exchange failed; the socket is reset
    /// - `Encryption` / `Decryption`: Body protection failed
    pub async fn send(&self, body: impl Into<Bytes>) -> Result<Bytes> {
        let body = body.into();

        let closed = self.closing.notified();
        tokio::pin!(closed);
        closed.as_mut().enable();
        let epoch = self.close_epoch.load(Ordering::SeqCst);

        let mut slot = self.stream.lock().await;
        if self.close_epoch.load(Ordering::SeqCst) != epoch {
            return Err(ClientError::Closed);
        }
        if slot.is_none() {
            // A cancelled call may have left the state Secured.
            self.reset(&mut slot).await;
            debug!(client_id = %self.id, "No live socket, reconnecting");
            if self.config.secure {
                self.keypair().await?;
            }
            self.connect(&mut slot, self.config.secure).await?;
            if self.close_epoch.load(Ordering::SeqCst) != epoch {
                self.reset(&mut slot).await;
                return Err(ClientError::Closed);
            }
        }

        let session_key = self.channel.read().session_key.clone();
        let payload = match &session_key {
            Some(key) => Bytes::from(self.cipher.seal(key, &body).map_err(|e| {
                ClientError::Encryption {
                    reason: e.to_string(),
                }
            })?),
            None => body,
        };

        // Out of the slot until the reply is read, so a dropped call
        // cannot leave an unread reply behind for the next one.
        let Some(mut stream) = slot.take() else {
            return Err(ClientError::Closed);
        };

        let request = Message::data(payload);
        let timeout = self.config.request_timeout();
        let exchange = async {
            stream
                .write_message(&request)
                .await
                .map_err(ClientError::from_write)?;
            stream
                .read_message_timeout(timeout)
                .await
                .map_err(ClientError::from_read)
        };

        let outcome = tokio::select! {
            reply = exchange => reply,
            _ = &mut closed => Err(ClientError::Closed),
        };

        let reply = match outcome {
            Ok(reply) => {
                *slot = Some(stream);
                reply
            }
            Err(e) => {
                let _ = stream.shutdown().await;
                warn!(client_id = %self.id, error = %e, "Exchange failed, resetting socket");
                self.reset(&mut slot).await;
                return Err(e);
            }
        };

        match reply.kind {
            MessageKind::Data => {}
            MessageKind::Error => {
                let reason = reply.error_reason().unwrap_or_default();
                debug!(client_id = %self.id, %reason, "Request rejected");
                return Err(ClientError::Rejected { reason });
            }
            MessageKind::Handshake => {
                self.reset(&mut slot).await;
                return Err(ClientError::Decode {
                    reason: "unexpected handshake message in reply".into(),
                });
            }
        }

        match &session_key {
            Some(key) => self
                .cipher
                .open(key, &reply.body)
                .map(Bytes::from)
                .map_err(|_| ClientError::Decryption),
            None => Ok(reply.body),
        }
    }

    /// Closes the socket and stops the prober. Idempotent.
    pub async fn close(&self) -> Result<()> {
        self.close_epoch.fetch_add(1, Ordering::SeqCst);
        self.closing.notify_waiters();

        let prober = self.prober.lock().take();
        if let Some(prober) = prober {
            prober.stop().await;
        }

        let mut slot = self.stream.lock().await;
        self.reset(&mut slot).await;
        Ok(())
    }

    /// Probes the server with a throwaway TCP connection.
    pub async fn is_open(&self) -> bool {
        probe(&self.config.addr(), self.config.timeout()).await
    }

    /// Registers an observer for successful opens and recoveries.
    pub fn on_connect<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.emitter.on(ConnectionEvent::Connect, move |_| handler());
    }

    /// Registers an observer for closes and lost connections.
    pub fn on_disconnect<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.emitter.on(ConnectionEvent::Disconnect, move |_| handler());
    }

    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Returns `true` while bodies are being encrypted.
    #[must_use]
    pub fn is_secured_channel(&self) -> bool {
        self.channel.read().session_key.is_some()
    }

    /// Server public key from the last handshake.
    #[must_use]
    pub fn server_public_key(&self) -> Option<PublicKey> {
        self.channel.read().server_key.clone()
    }

    /// Client public key, once generated.
    #[must_use]
    pub fn public_key(&self) -> Option<PublicKey> {
        self.keypair.get().map(|k| k.public_key().clone())
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn events(&self) -> &EventEmitter {
        &self.emitter
    }

    // ========================================
    // Internals
    // ========================================

    fn set_state(&self, next: ConnectionState) -> ConnectionState {
        std::mem::replace(&mut *self.state.write(), next)
    }

    async fn keypair(&self) -> Result<Arc<RsaKeyPair>> {
        let bits = self.config.key_bits;
        let id = self.id;
        self.keypair
            .get_or_try_init(|| async move {
                info!(client_id = %id, bits, "Generating client RSA keypair");
                let pair = tokio::task::spawn_blocking(move || RsaKeyPair::generate(bits))
                    .await
                    .map_err(|e| ClientError::KeyGeneration {
                        reason: format!("key generation task: {}", e),
                    })?
                    .map_err(ClientError::from_key_generation)?;
                Ok::<_, ClientError>(Arc::new(pair))
            })
            .await
            .cloned()
    }

    fn start_prober(&self) {
        let mut prober = self.prober.lock();
        if prober.as_ref().is_some_and(|p| !p.is_finished()) {
            return;
        }
        *prober = Some(
            Prober::new(self.config.addr(), self.config.timeout(), self.emitter.clone()).spawn(),
        );
    }

    /// Dials and, when `handshake` is set, negotiates keys. Stores the
    /// stream in `slot` only on success.
    async fn connect(&self, slot: &mut Option<Stream>, handshake: bool) -> Result<()> {
        self.config.validate()?;
        let addr = self.config.addr();
        self.set_state(ConnectionState::Connecting);

        let mut stream = match dial(&addr, self.config.timeout()).await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(ConnectionState::Closed);
                return Err(ClientError::from_dial(&addr, e));
            }
        };

        if handshake {
            self.set_state(ConnectionState::Handshaking);
            if let Err(e) = self.handshake(&mut stream).await {
                let _ = stream.shutdown().await;
                self.set_state(ConnectionState::Closed);
                return Err(e);
            }
        }

        *slot = Some(stream);
        self.set_state(ConnectionState::Secured);
        info!(
            client_id = %self.id,
            addr = %addr,
            encrypted = self.is_secured_channel(),
            "Connection established"
        );
        self.emitter.emit(ConnectionEvent::Connect);
        Ok(())
    }

    async fn handshake(&self, stream: &mut Stream) -> Result<()> {
        let keypair = if self.config.secure {
            Some(self.keypair().await?)
        } else {
            None
        };

        let hello = Message::handshake(keypair.as_ref().map(|k| k.public_key().clone()));
        stream
            .write_message(&hello)
            .await
            .map_err(ClientError::from_write)?;
        let reply = stream
            .read_message_timeout(self.config.request_timeout())
            .await
            .map_err(ClientError::from_read)?;

        match reply.kind {
            MessageKind::Handshake => {}
            MessageKind::Error => {
                return Err(ClientError::handshake(format!(
                    "server refused: {}",
                    reply.error_reason().unwrap_or_default()
                )));
            }
            MessageKind::Data => {
                return Err(ClientError::handshake("expected a handshake response"));
            }
        }

        let session_key = match (&reply.session_key_blob, &keypair) {
            (Some(blob), Some(keypair)) => Some(unwrap_session_key(blob, keypair).map_err(
                |e| ClientError::handshake(format!("cannot recover session key: {}", e)),
            )?),
            (Some(_), None) => {
                return Err(ClientError::handshake(
                    "session key received without offering a public key",
                ));
            }
            (None, _) => None,
        };

        if let Some(server_key) = &reply.public_key {
            debug!(client_id = %self.id, server_key = %server_key, "Handshake complete");
        }
        *self.channel.write() = Channel {
            server_key: reply.public_key,
            session_key,
        };
        Ok(())
    }

    /// Drops the socket and forgets the session key.
    async fn reset(&self, slot: &mut Option<Stream>) {
        if let Some(mut stream) = slot.take() {
            let _ = stream.shutdown().await;
        }
        self.channel.write().session_key = None;

        let previous = self.set_state(ConnectionState::Closed);
        if previous == ConnectionState::Secured {
            info!(client_id = %self.id, "Connection closed");
            self.emitter.emit(ConnectionEvent::Disconnect);
        }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        if let Some(prober) = self.prober.get_mut().take() {
            prober.signal();
        }
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("addr", &self.config.addr())
            .field("state", &self.state())
            .field("secured_channel", &self.is_secured_channel())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

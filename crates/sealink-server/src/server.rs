// ============================================
// File: crates/sealink-server/src/server.rs
// ============================================
//! # Server Listener
//!
//! ## Creation Reason
//! Accepts TCP connections, runs one session task per client, and
//! manages the listener lifecycle.
//!
//! ## Main Functionality
//! - `Listener`: Open/close lifecycle, handler registration, queries
//! - Accept loop with shutdown signal
//! - Per-connection session loop (handshake, data, error replies)
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Listener                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────┐   accept   ┌──────────────────────────┐   │
//! │  │ Accept Task  │──────────► │ Session Task (per client)│   │
//! │  │              │            │  read → reply → repeat   │   │
//! │  └──────┬───────┘            └────────────┬─────────────┘   │
//! │         │ add                             │ remove          │
//! │         ▼                                 ▼                 │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                ConnectionRegistry                   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                                                             │
//! │  HandshakeService          MessageDispatcher                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `close` stops accepting; live sessions run until their peer leaves
//! - A session is removed from the registry only when its task ends
//! - The server keypair survives close/reopen
//!
//! ## Last Modified
//! v0.1.0 - Initial listener implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sealink_core::crypto::{PublicKey, RsaKeyPair};
use sealink_core::protocol::{Message, MessageKind};
use sealink_transport::{bind_listener, FramedStream, TransportError};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::handlers::{MessageDispatcher, MessageHandler};
use crate::services::{ClientSession, ConnectionRegistry, HandshakeService};

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long `close` waits for the accept task to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Reason sent when a handshake cannot be answered.
const HANDSHAKE_FAILED: &str = "handshake failed";

/// Reason sent when a client sends an `Error` message.
const UNEXPECTED_ERROR_MESSAGE: &str = "unexpected error message";

// ============================================
// Connection Context
// ============================================

/// Shared state every session task needs.
struct ConnectionContext {
    registry: Arc<ConnectionRegistry>,
    handshake: HandshakeService,
    dispatcher: Arc<MessageDispatcher>,
}

/// State that exists only while the listener is open.
struct Running {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

// ============================================
// Listener
// ============================================

/// SeaLink server listener.
///
/// # Lifecycle
/// 1. Create with `Listener::new(config)`
/// 2. Register the application handler with `on_message`
/// 3. `open().await` binds and starts accepting
/// 4. `close().await` stops accepting
pub struct Listener {
    config: ServerConfig,
    keypair: OnceCell<Arc<RsaKeyPair>>,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<MessageDispatcher>,
    running: Mutex<Option<Running>>,
    lifecycle: tokio::sync::Mutex<()>,
}

impl Listener {
    /// Creates a listener; the keypair is generated on first `open`.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self::build(config, OnceCell::new())
    }

    /// Creates a listener that uses an existing keypair.
    #[must_use]
    pub fn with_keypair(config: ServerConfig, keypair: Arc<RsaKeyPair>) -> Self {
        Self::build(config, OnceCell::new_with(Some(keypair)))
    }

    fn build(config: ServerConfig, keypair: OnceCell<Arc<RsaKeyPair>>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.limits.max_sessions));
        Self {
            config,
            keypair,
            registry,
            dispatcher: Arc::new(MessageDispatcher::new()),
            running: Mutex::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers the application handler, replacing any previous one.
    pub fn on_message<H>(&self, handler: H)
    where
        H: MessageHandler + 'static,
    {
        self.dispatcher.set_handler(Arc::new(handler));
    }

    /// Binds the configured address and starts accepting clients.
    ///
    /// # Returns
    /// The bound address (useful when the configured port is 0).
    ///
    /// # Errors
    /// - `AlreadyOpen`: The listener is running
    /// - `Core`: Keypair generation failed
    /// - `StartupFailed`: Binding failed
    pub async fn open(&self) -> Result<SocketAddr> {
        let _guard = self.lifecycle.lock().await;
        if self.running.lock().is_some() {
            return Err(ServerError::AlreadyOpen);
        }

        let keypair = self.keypair().await?;

        let listener = bind_listener(self.config.listen_addr()).map_err(|e| {
            ServerError::startup_failed(format!("TCP bind failed: {}", e))
        })?;
        let local_addr = listener.local_addr()?;

        let ctx = Arc::new(ConnectionContext {
            registry: Arc::clone(&self.registry),
            handshake: HandshakeService::new(keypair),
            dispatcher: Arc::clone(&self.dispatcher),
        });

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(accept_loop(listener, ctx, shutdown_rx));

        *self.running.lock() = Some(Running {
            local_addr,
            shutdown_tx,
            task,
        });

        info!(
            addr = %local_addr,
            max_sessions = self.registry.max_sessions(),
            "Listener open"
        );
        Ok(local_addr)
    }

    /// Stops accepting new clients. Live sessions are left running.
    ///
    /// # Errors
    /// `NotOpen` if the listener is not running.
    pub async fn close(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        let running = self.running.lock().take().ok_or(ServerError::NotOpen)?;

        let _ = running.shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, running.task).await {
            Ok(Ok(())) => debug!("Accept task completed"),
            Ok(Err(e)) => warn!("Accept task failed: {}", e),
            Err(_) => warn!("Accept task timed out during shutdown"),
        }

        info!(
            addr = %running.local_addr,
            live_sessions = self.registry.count(),
            "Listener closed"
        );
        Ok(())
    }

    /// Number of live client sessions.
    #[must_use]
    pub fn clients_count(&self) -> usize {
        self.registry.count()
    }

    /// Peer addresses of live client sessions.
    #[must_use]
    pub fn clients_id(&self) -> Vec<SocketAddr> {
        self.registry.ids()
    }

    /// Bound address while open.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.local_addr)
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Server public key, once generated.
    #[must_use]
    pub fn public_key(&self) -> Option<PublicKey> {
        self.keypair.get().map(|k| k.public_key().clone())
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    async fn keypair(&self) -> Result<Arc<RsaKeyPair>> {
        let bits = self.config.keys.rsa_bits;
        self.keypair
            .get_or_try_init(|| async move {
                info!(bits, "Generating server RSA keypair");
                let pair = tokio::task::spawn_blocking(move || RsaKeyPair::generate(bits))
                    .await
                    .map_err(|e| {
                        ServerError::startup_failed(format!("key generation task: {}", e))
                    })??;
                info!(fingerprint = %pair.public_key(), "Server keypair ready");
                Ok::<_, ServerError>(Arc::new(pair))
            })
            .await
            .cloned()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            debug!(addr = %running.local_addr, "Listener dropped while open, stopping accept task");
            let _ = running.shutdown_tx.send(());
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("listen_addr", &self.config.listen_addr())
            .field("local_addr", &self.local_addr())
            .field("clients", &self.clients_count())
            .finish()
    }
}

// ============================================
// Accept Loop
// ============================================

async fn accept_loop(
    listener: TcpListener,
    ctx: Arc<ConnectionContext>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Accept task received shutdown signal");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => spawn_session(stream, peer, &ctx),
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
        }
    }

    debug!("Accept task exiting");
}

fn spawn_session(stream: TcpStream, peer: SocketAddr, ctx: &Arc<ConnectionContext>) {
    let session = match ctx.registry.add(peer) {
        Ok(session) => session,
        Err(e) => {
            warn!(peer = %peer, error = %e, "Refusing connection");
            return;
        }
    };

    if let Err(e) = stream.set_nodelay(true) {
        debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
    }

    let ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        serve_session(FramedStream::with_peer(stream, peer), session, ctx).await;
    });
}

// ============================================
// Session Loop
// ============================================

async fn serve_session<S>(
    mut stream: FramedStream<S>,
    session: Arc<ClientSession>,
    ctx: Arc<ConnectionContext>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let peer = session.id;
    debug!(peer = %peer, "Session started");

    loop {
        let request = match stream.read_message().await {
            Ok(msg) => msg,
            Err(TransportError::ConnectionClosed) => {
                debug!(peer = %peer, "Client disconnected");
                break;
            }
            Err(e) => {
                if e.is_decode_error() {
                    warn!(peer = %peer, error = %e, "Dropping client after invalid frame");
                } else {
                    debug!(peer = %peer, error = %e, "Session read failed");
                }
                break;
            }
        };
        session.stats.record_rx(request.body.len() as u64);

        let reply = match request.kind {
            MessageKind::Handshake => match ctx.handshake.process(&session, &request) {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "Handshake failed");
                    Message::error(HANDSHAKE_FAILED)
                }
            },
            MessageKind::Data => ctx.dispatcher.dispatch(&session, request).await,
            MessageKind::Error => {
                debug!(peer = %peer, "Client sent an error message");
                Message::error(UNEXPECTED_ERROR_MESSAGE)
            }
        };

        let reply_len = reply.body.len() as u64;
        if let Err(e) = stream.write_message(&reply).await {
            debug!(peer = %peer, error = %e, "Session write failed");
            break;
        }
        session.stats.record_tx(reply_len);
    }

    ctx.registry.remove(&peer);
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use once_cell::sync::Lazy;
    use sealink_core::crypto::{
        decrypt_symmetric, encrypt_symmetric, unwrap_session_key, MIN_RSA_BITS,
    };
    use sealink_core::protocol::{ACK_OK, HANDSHAKE_MARKER};
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    static SERVER_KEY: Lazy<Arc<RsaKeyPair>> =
        Lazy::new(|| Arc::new(RsaKeyPair::generate(MIN_RSA_BITS).unwrap()));
    static CLIENT_KEY: Lazy<RsaKeyPair> =
        Lazy::new(|| RsaKeyPair::generate(MIN_RSA_BITS).unwrap());

    fn peer(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn context(dispatcher: MessageDispatcher) -> Arc<ConnectionContext> {
        Arc::new(ConnectionContext {
            registry: Arc::new(ConnectionRegistry::new(16)),
            handshake: HandshakeService::new(Arc::clone(&SERVER_KEY)),
            dispatcher: Arc::new(dispatcher),
        })
    }

    fn echo_dispatcher() -> MessageDispatcher {
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_handler(Arc::new(|msg: &Message| Some(msg.body.clone())));
        dispatcher
    }

    /// Starts a session task on one end of an in-memory pipe.
    fn start_raw_session(ctx: &Arc<ConnectionContext>, port: u16) -> (DuplexStream, JoinHandle<()>) {
        let (client, server) = duplex(64 * 1024);
        let session = ctx.registry.add(peer(port)).unwrap();
        let task = tokio::spawn(serve_session(
            FramedStream::with_peer(server, peer(port)),
            session,
            Arc::clone(ctx),
        ));
        (client, task)
    }

    fn start_session(
        ctx: &Arc<ConnectionContext>,
        port: u16,
    ) -> (FramedStream<DuplexStream>, JoinHandle<()>) {
        let (client, task) = start_raw_session(ctx, port);
        (FramedStream::new(client), task)
    }

    #[tokio::test]
    async fn test_secure_handshake_and_data() {
        let ctx = context(echo_dispatcher());
        let (mut client, _task) = start_session(&ctx, 1001);

        client
            .write_message(&Message::handshake(Some(CLIENT_KEY.public_key().clone())))
            .await
            .unwrap();
        let ack = client.read_message().await.unwrap();
        assert_eq!(ack.kind, MessageKind::Handshake);
        assert_eq!(&ack.body[..], HANDSHAKE_MARKER);
        assert_eq!(ack.public_key.as_ref(), Some(SERVER_KEY.public_key()));

        let key = unwrap_session_key(&ack.session_key_blob.unwrap(), &CLIENT_KEY).unwrap();
        let session = ctx.registry.get(&peer(1001)).unwrap();
        assert_eq!(&key, session.session_key());

        let sealed = encrypt_symmetric(b"hello", &key).unwrap();
        client.write_message(&Message::data(sealed)).await.unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.kind, MessageKind::Data);
        assert_eq!(decrypt_symmetric(&reply.body, &key).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_plain_handshake_and_data() {
        let ctx = context(MessageDispatcher::new());
        let (mut client, _task) = start_session(&ctx, 1002);

        client.write_message(&Message::handshake(None)).await.unwrap();
        let ack = client.read_message().await.unwrap();
        assert!(ack.session_key_blob.is_none());

        client.write_message(&Message::data("ping")).await.unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(&reply.body[..], ACK_OK);
    }

    #[tokio::test]
    async fn test_decrypt_failure_keeps_session() {
        let ctx = context(echo_dispatcher());
        let (mut client, _task) = start_session(&ctx, 1003);

        client
            .write_message(&Message::handshake(Some(CLIENT_KEY.public_key().clone())))
            .await
            .unwrap();
        let ack = client.read_message().await.unwrap();
        let key = unwrap_session_key(&ack.session_key_blob.unwrap(), &CLIENT_KEY).unwrap();

        client
            .write_message(&Message::data(Bytes::from_static(b"garbage, not sealed")))
            .await
            .unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(ctx.registry.count(), 1);

        let sealed = encrypt_symmetric(b"still here", &key).unwrap();
        client.write_message(&Message::data(sealed)).await.unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(decrypt_symmetric(&reply.body, &key).unwrap(), b"still here");
    }

    #[tokio::test]
    async fn test_malformed_frame_removes_only_that_session() {
        let ctx = context(MessageDispatcher::new());
        let (mut good, _good_task) = start_session(&ctx, 2001);
        let (mut raw, bad_task) = start_raw_session(&ctx, 2002);
        assert_eq!(ctx.registry.count(), 2);

        raw.write_all(&[5, 0, 0, 0, 1, 0x7F, 0, 0, 0]).await.unwrap();
        bad_task.await.unwrap();

        assert_eq!(ctx.registry.ids(), vec![peer(2001)]);

        good.write_message(&Message::data("ping")).await.unwrap();
        let reply = good.read_message().await.unwrap();
        assert_eq!(&reply.body[..], ACK_OK);
    }

    #[tokio::test]
    async fn test_disconnect_removes_session() {
        let ctx = context(MessageDispatcher::new());
        let (client, task) = start_session(&ctx, 3001);
        assert_eq!(ctx.registry.count(), 1);

        drop(client);
        task.await.unwrap();
        assert!(ctx.registry.is_empty());
    }

    #[tokio::test]
    async fn test_client_error_message_is_answered() {
        let ctx = context(MessageDispatcher::new());
        let (mut client, _task) = start_session(&ctx, 4001);

        client.write_message(&Message::error("boom")).await.unwrap();
        let reply = client.read_message().await.unwrap();
        assert_eq!(reply.error_reason().as_deref(), Some(UNEXPECTED_ERROR_MESSAGE));
        assert_eq!(ctx.registry.count(), 1);
    }

    #[tokio::test]
    async fn test_listener_lifecycle() {
        let mut config = ServerConfig::default();
        config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
        let listener = Listener::with_keypair(config, Arc::clone(&SERVER_KEY));

        assert!(!listener.is_open());
        assert!(matches!(listener.close().await, Err(ServerError::NotOpen)));

        let addr = listener.open().await.unwrap();
        assert!(listener.is_open());
        assert_eq!(listener.local_addr(), Some(addr));
        assert_eq!(listener.public_key().as_ref(), Some(SERVER_KEY.public_key()));
        assert!(matches!(listener.open().await, Err(ServerError::AlreadyOpen)));

        listener.close().await.unwrap();
        assert!(!listener.is_open());
        assert_eq!(listener.local_addr(), None);
    }

    #[tokio::test]
    async fn test_drop_releases_port() {
        let mut config = ServerConfig::default();
        config.network.listen_addr = "127.0.0.1:0".parse().unwrap();
        let listener = Listener::with_keypair(config, Arc::clone(&SERVER_KEY));
        let addr = listener.open().await.unwrap();
        assert!(TcpStream::connect(addr).await.is_ok());

        drop(listener);

        for _ in 0..50 {
            if TcpStream::connect(addr).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("port still accepting after drop");
    }
}

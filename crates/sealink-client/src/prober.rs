// ============================================
// File: crates/sealink-client/src/prober.rs
// ============================================
//! # Liveness Prober
//!
//! Background task that dials the server once per `PING_INTERVAL` and
//! emits `Connect`/`Disconnect` when reachability changes. It only
//! observes; reconnecting is left to the next `send`.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sealink_common::{ConnectionEvent, EventEmitter};
use sealink_transport::probe;

/// Probe period.
pub const PING_INTERVAL: Duration = Duration::from_secs(1);

/// How long `stop` waits for the task before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Periodic reachability check for one server address.
pub struct Prober {
    addr: String,
    timeout: Duration,
    interval: Duration,
    emitter: EventEmitter,
}

impl Prober {
    #[must_use]
    pub fn new(addr: impl Into<String>, timeout: Duration, emitter: EventEmitter) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            interval: PING_INTERVAL,
            emitter,
        }
    }

    /// Overrides the probe period.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs the probe loop until a shutdown signal is received.
    ///
    /// The first observation only records the initial state.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(addr = %self.addr, "Liveness prober started ({:?})", self.interval);
        let mut interval = tokio::time::interval(self.interval);
        let mut reachable: Option<bool> = None;

        loop {
            tokio::select! {
                _ = shutdown.recv() => { debug!("Liveness prober stopping"); break; }
                _ = interval.tick() => {
                    let now = probe(&self.addr, self.timeout).await;
                    match (reachable, now) {
                        (Some(false), true) => {
                            info!(addr = %self.addr, "Server reachable again");
                            self.emitter.emit(ConnectionEvent::Connect);
                        }
                        (Some(true), false) => {
                            warn!(addr = %self.addr, "Server unreachable");
                            self.emitter.emit(ConnectionEvent::Disconnect);
                        }
                        _ => {}
                    }
                    reachable = Some(now);
                }
            }
        }
    }

    /// Spawns the probe loop.
    #[must_use]
    pub fn spawn(self) -> ProberHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = tokio::spawn(self.run(shutdown_rx));
        ProberHandle { shutdown_tx, task }
    }
}

/// Handle to a running prober.
pub struct ProberHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl ProberHandle {
    /// Signals the prober and waits for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        let abort = self.task.abort_handle();
        match tokio::time::timeout(STOP_GRACE, self.task).await {
            Ok(_) => debug!("Liveness prober stopped"),
            Err(_) => {
                warn!("Liveness prober did not stop in time, aborting");
                abort.abort();
            }
        }
    }

    /// Signals the prober without waiting.
    pub fn signal(&self) {
        let _ = self.shutdown_tx.send(());
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

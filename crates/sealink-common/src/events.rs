// ============================================
// File: crates/sealink-common/src/events.rs
// ============================================
//! # Connection Events
//!
//! ## Creation Reason
//! Client connections notify observers about `connect`/`disconnect`
//! transitions. The emitter is owned by each connection and injected
//! where needed; there is no process-wide instance.
//!
//! ## Main Functionality
//! - `ConnectionEvent`: The transitions that can be observed
//! - `EventEmitter`: `on(event, handler)` / `emit(event)`
//!
//! ## Delivery
//! Handlers are fire-and-forget. Inside a Tokio runtime every handler is
//! run on its own spawned task, so a slow observer never blocks the
//! connection that emitted the event. Outside a runtime handlers run inline.
//!
//! ## Last Modified
//! v0.1.0 - Initial event emitter

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

/// Observable connection transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    /// The connection became reachable / secured.
    Connect,
    /// The connection was closed or lost.
    Disconnect,
}

impl fmt::Display for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
        }
    }
}

type Handler = Arc<dyn Fn(ConnectionEvent) + Send + Sync>;

/// Registry of event observers.
///
/// Cloning an emitter yields a handle to the same set of observers.
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: Arc<RwLock<HashMap<ConnectionEvent, Vec<Handler>>>>,
}

impl EventEmitter {
    /// Creates an emitter with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` to be notified whenever `event` is emitted.
    pub fn on<F>(&self, event: ConnectionEvent, handler: F)
    where
        F: Fn(ConnectionEvent) + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Notifies every observer of `event`.
    ///
    /// Returns the number of handlers that were scheduled.
    pub fn emit(&self, event: ConnectionEvent) -> usize {
        // Snapshot so handlers may register further observers without deadlocking.
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&event)
            .cloned()
            .unwrap_or_default();

        trace!(%event, observers = handlers.len(), "Emitting connection event");

        let runtime = tokio::runtime::Handle::try_current().ok();
        for handler in &handlers {
            match &runtime {
                Some(rt) => {
                    let handler = Arc::clone(handler);
                    rt.spawn(async move { handler(event) });
                }
                None => handler(event),
            }
        }

        handlers.len()
    }

    /// Returns the number of observers registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: ConnectionEvent) -> usize {
        self.handlers.read().get(&event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("connect", &self.listener_count(ConnectionEvent::Connect))
            .field("disconnect", &self.listener_count(ConnectionEvent::Disconnect))
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_emit_without_runtime_runs_inline() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        emitter.on(ConnectionEvent::Connect, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(emitter.emit(ConnectionEvent::Connect), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_are_routed_by_kind() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        emitter.on(ConnectionEvent::Disconnect, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(emitter.emit(ConnectionEvent::Connect), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.listener_count(ConnectionEvent::Disconnect), 1);
    }

    #[tokio::test]
    async fn test_emit_inside_runtime_is_async() {
        let emitter = EventEmitter::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        emitter.on(ConnectionEvent::Connect, move |event| {
            let _ = tx.send(event);
        });

        emitter.emit(ConnectionEvent::Connect);

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some(ConnectionEvent::Connect));
    }

    #[test]
    fn test_clones_share_observers() {
        let emitter = EventEmitter::new();
        let clone = emitter.clone();
        clone.on(ConnectionEvent::Connect, |_| {});
        assert_eq!(emitter.listener_count(ConnectionEvent::Connect), 1);
    }
}

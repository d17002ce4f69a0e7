//! Shared push-stream connections.
//!
//! A [`Connection`] wraps one transport and is shared by every element
//! subscribing to the same URL. It owns the readiness state machine, the
//! per-event-name listener lists, and the set of bound elements that
//! receive lifecycle events.
//!
//! # State Machine
//!
//! ```text
//!              open signal (event deferred, once)
//! CONNECTING ───────────────────────────────► OPEN
//!      │                                        │
//!      │ error signal / close()                 │ error signal / close()
//!      ▼                                        ▼
//!    CLOSED ◄─────────────────────────────────────
//!   (terminal: messages dropped, pending open cancelled)
//! ```
//!
//! # Event Loop
//!
//! Each connection spawns a tokio task that drains its transport signals in
//! arrival order. The open transition is scheduled as a separate task that
//! yields once before firing, so a caller that binds an element in the same
//! turn as creation still observes `htmx:sse:open`.
//!
//! # Thread Safety
//!
//! All mutable state sits behind one mutex per connection. Listener
//! callbacks are invoked after the lock is released.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::dispatch::LifecycleDispatcher;
use crate::error::Result;
use crate::identifiers::{ElementId, ListenerId};
use crate::transport::{
    Connector, MessageEvent, ReadyState, SignalReceiver, Transport, TransportSignal,
};

// ============================================================================
// Submodules
// ============================================================================

/// URL-keyed connection registry.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::Registry;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked for each message with a matching event name.
///
/// An `Err` is logged at the dispatch site; remaining listeners still run.
pub type Listener = Arc<dyn Fn(&MessageEvent) -> Result<()> + Send + Sync>;

/// Mutable connection state, guarded by the per-connection mutex.
struct ConnectionState {
    ready_state: ReadyState,
    /// The open transition has happened.
    open_fired: bool,
    /// A deferred open task is queued.
    open_pending: bool,
    /// The transport has reported `Open`.
    transport_open: bool,
    /// `close()` was called; transport errors are no longer reported.
    closed_explicitly: bool,
    /// Listeners by event name, in registration order.
    listeners: FxHashMap<String, Vec<(ListenerId, Listener)>>,
    /// Elements receiving lifecycle events, in binding order.
    bound: Vec<ElementId>,
}

/// Internal shared state for a connection.
pub(crate) struct ConnectionInner {
    url: String,
    transport: Box<dyn Transport>,
    state: Mutex<ConnectionState>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    lifecycle: LifecycleDispatcher,
}

// ============================================================================
// Connection
// ============================================================================

/// A push-stream subscription shared by all elements using the same URL.
///
/// Cloning yields another handle to the same connection; use
/// [`Connection::ptr_eq`] to test identity.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

// ============================================================================
// Connection - Display
// ============================================================================

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Connection")
            .field("url", &self.inner.url)
            .field("ready_state", &state.ready_state)
            .field("bound", &state.bound.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Constructor
// ============================================================================

impl Connection {
    /// Opens a transport for `url` and starts the event loop.
    ///
    /// Must be called within a tokio runtime. Does not wait for the stream.
    pub(crate) fn open(url: &str, connector: &dyn Connector, lifecycle: LifecycleDispatcher) -> Self {
        let (transport, signals) = connector.connect(url);
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        let connection = Self {
            inner: Arc::new(ConnectionInner {
                url: url.to_string(),
                transport,
                state: Mutex::new(ConnectionState {
                    ready_state: ReadyState::Connecting,
                    open_fired: false,
                    open_pending: false,
                    transport_open: false,
                    closed_explicitly: false,
                    listeners: FxHashMap::default(),
                    bound: Vec::new(),
                }),
                shutdown_tx,
                lifecycle,
            }),
        };

        tokio::spawn(connection.clone().run_event_loop(signals, shutdown_rx));
        debug!(url, "Connection event loop spawned");

        connection
    }
}

// ============================================================================
// Connection - Accessors
// ============================================================================

impl Connection {
    /// Returns the subscription URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns the current readiness state.
    ///
    /// `Open` is recorded as soon as the transport reports it; the
    /// `htmx:sse:open` event follows on a later scheduler turn.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.inner.state.lock().ready_state
    }

    /// Returns `true` once the connection is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ready_state() == ReadyState::Closed
    }

    /// Returns `true` if the open transition has happened.
    #[inline]
    #[must_use]
    pub fn open_fired(&self) -> bool {
        self.inner.state.lock().open_fired
    }

    /// Returns `true` if both handles refer to the same connection.
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

// ============================================================================
// Connection - Listeners
// ============================================================================

impl Connection {
    /// Registers a listener for `event`.
    ///
    /// Listeners for the same event run in registration order.
    pub fn add_event_listener<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&MessageEvent) -> Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId::generate();
        let event = event.into();
        trace!(url = %self.inner.url, %event, %id, "Adding listener");

        self.inner
            .state
            .lock()
            .listeners
            .entry(event)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let mut state = self.inner.state.lock();
        let mut removed = false;

        state.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|(listener_id, _)| *listener_id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });

        removed
    }

    /// Returns the number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .state
            .lock()
            .listeners
            .get(event)
            .map_or(0, Vec::len)
    }
}

// ============================================================================
// Connection - Bound Elements
// ============================================================================

impl Connection {
    /// Binds an element for lifecycle events. Returns `false` if already bound.
    pub fn bind(&self, element: &ElementId) -> bool {
        let mut state = self.inner.state.lock();
        if state.bound.contains(element) {
            return false;
        }
        state.bound.push(element.clone());
        true
    }

    /// Unbinds an element. Returns `false` if it was not bound.
    pub fn unbind(&self, element: &ElementId) -> bool {
        let mut state = self.inner.state.lock();
        let before = state.bound.len();
        state.bound.retain(|e| e != element);
        state.bound.len() != before
    }

    /// Returns the bound elements in binding order.
    #[must_use]
    pub fn bound_elements(&self) -> Vec<ElementId> {
        self.inner.state.lock().bound.clone()
    }
}

// ============================================================================
// Connection - Lifecycle
// ============================================================================

impl Connection {
    /// Closes the connection.
    ///
    /// Idempotent. Cancels a pending open, stops the event loop so queued
    /// deliveries are dropped, and never dispatches `htmx:sse:error`.
    pub fn close(&self) {
        let was_closed = {
            let mut state = self.inner.state.lock();
            let was_closed = state.ready_state == ReadyState::Closed;
            state.ready_state = ReadyState::Closed;
            state.open_pending = false;
            state.closed_explicitly = true;
            was_closed
        };

        self.inner.transport.close();
        // The event loop may already have exited.
        let _ = self.inner.shutdown_tx.send(());

        if !was_closed {
            debug!(url = %self.inner.url, "Connection closed");
        }
    }

    /// Queues the deferred `htmx:sse:open` dispatch.
    ///
    /// No-op unless the transport has reported open, the connection is not
    /// closed, and no open has fired or been queued yet.
    pub(crate) fn schedule_open(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.open_fired
                || state.open_pending
                || !state.transport_open
                || state.ready_state == ReadyState::Closed
            {
                return;
            }
            state.open_pending = true;
        }

        let connection = self.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            connection.fire_open();
        });
    }

    fn fire_open(&self) {
        let elements = {
            let mut state = self.inner.state.lock();
            let cancelled = !state.open_pending;
            state.open_pending = false;

            if cancelled || state.open_fired || state.ready_state == ReadyState::Closed {
                trace!(url = %self.inner.url, "Deferred open suppressed");
                return;
            }

            state.open_fired = true;
            state.bound.clone()
        };

        info!(url = %self.inner.url, bound = elements.len(), "Connection open");
        self.inner.lifecycle.dispatch_open(&self.inner.url, &elements);
    }

    fn fail(&self, message: &str) {
        let elements = {
            let mut state = self.inner.state.lock();
            if state.closed_explicitly {
                trace!(url = %self.inner.url, error = message, "Ignoring transport error after close");
                return;
            }
            state.ready_state = ReadyState::Closed;
            state.open_pending = false;
            state.bound.clone()
        };

        warn!(url = %self.inner.url, error = message, "Transport error");
        self.inner.transport.close();
        self.inner.lifecycle.dispatch_error(&self.inner.url, &elements);
    }
}

// ============================================================================
// Connection - Event Loop
// ============================================================================

impl Connection {
    /// Drains transport signals until shutdown or the transport goes away.
    async fn run_event_loop(
        self,
        mut signals: SignalReceiver,
        mut shutdown_rx: mpsc::UnboundedReceiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv() => {
                    debug!(url = %self.inner.url, "Shutdown received");
                    break;
                }

                signal = signals.recv() => {
                    match signal {
                        Some(signal) => self.handle_signal(signal),
                        None => {
                            debug!(url = %self.inner.url, "Transport signal channel closed");
                            self.inner.state.lock().ready_state = ReadyState::Closed;
                            break;
                        }
                    }
                }
            }
        }

        debug!(url = %self.inner.url, "Event loop terminated");
    }

    fn handle_signal(&self, signal: TransportSignal) {
        match signal {
            TransportSignal::Open => {
                {
                    let mut state = self.inner.state.lock();
                    state.transport_open = true;
                    if state.ready_state == ReadyState::Connecting {
                        state.ready_state = ReadyState::Open;
                    }
                }
                self.schedule_open();
            }
            TransportSignal::Message(event) => self.deliver(&event),
            TransportSignal::Error { message } => self.fail(&message),
        }
    }

    fn deliver(&self, event: &MessageEvent) {
        let listeners: Vec<(ListenerId, Listener)> = {
            let state = self.inner.state.lock();
            if state.ready_state == ReadyState::Closed {
                trace!(url = %self.inner.url, event = %event.event, "Dropping message on closed connection");
                return;
            }
            state.listeners.get(&event.event).cloned().unwrap_or_default()
        };

        trace!(
            url = %self.inner.url,
            event = %event.event,
            listeners = listeners.len(),
            "Delivering message"
        );

        for (id, listener) in listeners {
            if let Err(e) = listener(event) {
                warn!(url = %self.inner.url, event = %event.event, %id, error = %e, "Listener failed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::dispatch::{ERROR_EVENT, OPEN_EVENT};
    use crate::error::Error;
    use crate::host::MemoryDom;
    use crate::transport::MockConnector;

    /// Lets spawned event loop and open tasks run to completion.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    fn setup(connector: &MockConnector) -> (Arc<MemoryDom>, Connection) {
        let dom = Arc::new(MemoryDom::new());
        let connection = Connection::open(
            "/events",
            connector,
            LifecycleDispatcher::new(dom.clone()),
        );
        (dom, connection)
    }

    fn counter_listener(count: &Arc<AtomicUsize>) -> impl Fn(&MessageEvent) -> Result<()> + use<> {
        let count = Arc::clone(count);
        move |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_open_is_deferred_and_fires_once() {
        let connector = MockConnector::new();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.schedule_open();
        connection.bind(&div);

        assert_eq!(connection.ready_state(), ReadyState::Connecting);
        assert!(dom.events(&div).is_empty());

        settle().await;
        assert_eq!(connection.ready_state(), ReadyState::Open);
        assert_eq!(dom.event_count(&div, OPEN_EVENT), 1);

        // Repeated open signals and a late binder do not refire.
        let late = dom.create_element(None);
        connection.bind(&late);
        connector.transport("/events").unwrap().simulate_open();
        connection.schedule_open();
        settle().await;

        assert_eq!(dom.event_count(&div, OPEN_EVENT), 1);
        assert_eq!(dom.event_count(&late, OPEN_EVENT), 0);
    }

    #[tokio::test]
    async fn test_close_before_deferred_open_suppresses_it() {
        let connector = MockConnector::new();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.bind(&div);

        connection.close();
        settle().await;

        assert!(connection.is_closed());
        assert!(!connection.open_fired());
        assert!(dom.events(&div).is_empty());
    }

    #[tokio::test]
    async fn test_manual_transport_waits_for_open_signal() {
        let connector = MockConnector::manual();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.bind(&div);

        settle().await;
        assert_eq!(connection.ready_state(), ReadyState::Connecting);

        connector.transport("/events").unwrap().simulate_open();
        settle().await;
        assert_eq!(dom.event_count(&div, OPEN_EVENT), 1);
    }

    #[tokio::test]
    async fn test_listeners_run_in_registration_order() {
        let connector = MockConnector::new();
        let (_dom, connection) = setup(&connector);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            connection.add_event_listener("chat", move |event: &MessageEvent| {
                order.lock().push(format!("{tag}:{}", event.data));
                Ok(())
            });
        }

        let transport = connector.transport("/events").unwrap();
        transport.simulate_message("chat", "a");
        transport.simulate_message("chat", "b");
        settle().await;

        assert_eq!(
            *order.lock(),
            ["first:a", "second:a", "third:a", "first:b", "second:b", "third:b"]
        );
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_stop_fan_out() {
        let connector = MockConnector::new();
        let (_dom, connection) = setup(&connector);
        let count = Arc::new(AtomicUsize::new(0));

        connection.add_event_listener("message", |_: &MessageEvent| Err(Error::listener("threw")));
        connection.add_event_listener("message", counter_listener(&count));

        connector.transport("/events").unwrap().simulate_message("", "x");
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remove_event_listener() {
        let connector = MockConnector::new();
        let (_dom, connection) = setup(&connector);
        let count = Arc::new(AtomicUsize::new(0));

        let id = connection.add_event_listener("news", counter_listener(&count));
        assert_eq!(connection.listener_count("news"), 1);
        assert!(connection.remove_event_listener(id));
        assert!(!connection.remove_event_listener(id));
        assert_eq!(connection.listener_count("news"), 0);

        connector.transport("/events").unwrap().simulate_message("news", "x");
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_error_closes_and_drops_later_messages() {
        let connector = MockConnector::new();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.bind(&div);
        let count = Arc::new(AtomicUsize::new(0));
        connection.add_event_listener("message", counter_listener(&count));
        settle().await;

        let transport = connector.transport("/events").unwrap();
        transport.simulate_error();
        transport.simulate_message("", "late");
        settle().await;

        assert_eq!(connection.ready_state(), ReadyState::Closed);
        assert_eq!(dom.event_count(&div, ERROR_EVENT), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        // Repeated transport errors are reported again.
        transport.simulate_error();
        settle().await;
        assert_eq!(dom.event_count(&div, ERROR_EVENT), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_silent() {
        let connector = MockConnector::new();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.bind(&div);
        settle().await;

        connection.close();
        connection.close();
        connector.transport("/events").unwrap().simulate_message("", "queued");
        settle().await;

        assert!(connection.is_closed());
        assert_eq!(dom.event_count(&div, ERROR_EVENT), 0);
        assert_eq!(
            connector.transport("/events").unwrap().ready_state(),
            ReadyState::Closed
        );
    }

    #[tokio::test]
    async fn test_open_state_recorded_before_event() {
        let connector = MockConnector::manual();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.bind(&div);

        connection.handle_signal(TransportSignal::Open);
        assert_eq!(connection.ready_state(), ReadyState::Open);
        assert!(!connection.open_fired());
        assert!(dom.events(&div).is_empty());

        settle().await;
        assert!(connection.open_fired());
        assert_eq!(dom.event_count(&div, OPEN_EVENT), 1);
    }

    #[tokio::test]
    async fn test_error_after_close_is_silent() {
        let connector = MockConnector::manual();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);
        connection.bind(&div);

        connection.close();
        connection.handle_signal(TransportSignal::error("reset"));
        settle().await;

        assert!(connection.is_closed());
        assert_eq!(dom.event_count(&div, ERROR_EVENT), 0);
    }

    #[tokio::test]
    async fn test_bind_is_idempotent() {
        let connector = MockConnector::new();
        let (dom, connection) = setup(&connector);
        let div = dom.create_element(None);

        assert!(connection.bind(&div));
        assert!(!connection.bind(&div));
        assert_eq!(connection.bound_elements(), vec![div.clone()]);
        assert!(connection.unbind(&div));
        assert!(!connection.unbind(&div));
    }
}

//! Scriptable in-process transport.
//!
//! [`MockConnector`] hands out [`MockTransport`]s that never touch the
//! network. Tests drive them with `simulate_*` calls; each call becomes a
//! [`TransportSignal`] on the connection's channel, exactly as a real
//! stream would report it. A mock transport never reconnects.
//!
//! # Example
//!
//! ```ignore
//! let connector = Arc::new(MockConnector::new());
//! // ... process elements subscribing to /events ...
//! let transport = connector.transport("/events").unwrap();
//! transport.simulate_message("chat", "<div>Chat message</div>");
//! transport.simulate_error();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

use crate::config::DEFAULT_SWAP_EVENT;

use super::{
    Connector, MessageEvent, ReadyState, SignalReceiver, SignalSender, Transport, TransportSignal,
};

// ============================================================================
// MockTransport
// ============================================================================

/// Internal shared state for a mock transport.
struct MockInner {
    url: String,
    sender: SignalSender,
    state: Mutex<ReadyState>,
    open_pending: AtomicBool,
}

/// Handle to one mock push stream. Clones share state.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("url", &self.inner.url)
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Creates a transport and the receiving end of its signal channel.
    #[must_use]
    pub fn new(url: impl Into<String>) -> (Self, SignalReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            inner: Arc::new(MockInner {
                url: url.into(),
                sender,
                state: Mutex::new(ReadyState::Connecting),
                open_pending: AtomicBool::new(false),
            }),
        };
        (transport, receiver)
    }

    /// Returns the transport's own readiness.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        *self.inner.state.lock()
    }

    /// Queues the open signal once; later calls are no-ops.
    pub fn schedule_open(&self) {
        if self.inner.open_pending.swap(true, Ordering::SeqCst) {
            return;
        }
        self.simulate_open();
    }

    /// Reports the stream as established.
    pub fn simulate_open(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == ReadyState::Connecting {
                *state = ReadyState::Open;
            }
        }
        self.send(TransportSignal::Open);
    }

    /// Delivers a message. An empty name means the unnamed `message` event.
    ///
    /// Delivery is reported even after close; dropping late messages is the
    /// connection's job.
    pub fn simulate_message(&self, event: &str, data: &str) {
        let event = if event.is_empty() {
            DEFAULT_SWAP_EVENT
        } else {
            event
        };
        self.send(TransportSignal::Message(MessageEvent::new(event, data)));
    }

    /// Reports a stream failure and marks the transport closed.
    pub fn simulate_error(&self) {
        *self.inner.state.lock() = ReadyState::Closed;
        self.send(TransportSignal::error("simulated transport error"));
    }

    fn send(&self, signal: TransportSignal) {
        trace!(url = %self.inner.url, ?signal, "Mock transport signal");
        // The receiver is gone once the connection's event loop exits.
        let _ = self.inner.sender.send(signal);
    }
}

impl Transport for MockTransport {
    fn url(&self) -> &str {
        &self.inner.url
    }

    fn close(&self) {
        *self.inner.state.lock() = ReadyState::Closed;
    }
}

// ============================================================================
// MockConnector
// ============================================================================

/// Connector that records every transport it opens.
pub struct MockConnector {
    /// Queue the open signal as soon as a transport is created.
    auto_open: bool,
    /// Every transport opened, in order.
    transports: Mutex<Vec<MockTransport>>,
}

impl fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConnector")
            .field("auto_open", &self.auto_open)
            .field("transports", &self.transports.lock().len())
            .finish()
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Creates a connector whose transports open on their own.
    #[must_use]
    pub fn new() -> Self {
        Self {
            auto_open: true,
            transports: Mutex::new(Vec::new()),
        }
    }

    /// Creates a connector whose transports wait for `simulate_open`.
    #[must_use]
    pub fn manual() -> Self {
        Self {
            auto_open: false,
            transports: Mutex::new(Vec::new()),
        }
    }

    /// Returns the most recent transport opened for `url`.
    #[must_use]
    pub fn transport(&self, url: &str) -> Option<MockTransport> {
        self.transports
            .lock()
            .iter()
            .rev()
            .find(|t| t.url() == url)
            .cloned()
    }

    /// Returns how many transports were opened for `url`.
    #[must_use]
    pub fn connect_count(&self, url: &str) -> usize {
        self.transports
            .lock()
            .iter()
            .filter(|t| t.url() == url)
            .count()
    }
}

impl Connector for MockConnector {
    fn connect(&self, url: &str) -> (Box<dyn Transport>, SignalReceiver) {
        let (transport, receiver) = MockTransport::new(url);
        if self.auto_open {
            transport.schedule_open();
        }
        self.transports.lock().push(transport.clone());
        (Box::new(transport), receiver)
    }
}

// ============================================================================
// Tests
// ============================================================================

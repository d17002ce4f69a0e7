//! Push-stream transport layer.
//!
//! A transport is one server-to-client event stream. It reports readiness,
//! named messages and failures as [`TransportSignal`]s on a channel; the
//! owning [`Connection`](crate::Connection) drains that channel on its own
//! event loop task.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   connect(url)   ┌──────────────┐
//! │  Registry    │─────────────────►│  Connector   │
//! │              │◄─────────────────│              │
//! └──────┬───────┘ (Transport, rx)  └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐  Open / Message / Error  ┌──────────────┐
//! │  Connection  │◄─────────────────────────│  Transport   │
//! │  event loop  │                          │  (stream)    │
//! └──────────────┘                          └──────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `http` | `text/event-stream` over HTTP via reqwest and eventsource-stream |
//! | `mock` | Scriptable transport for tests |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;

// ============================================================================
// Submodules
// ============================================================================

/// HTTP event-stream transport.
pub mod http;

/// Scriptable in-process transport.
pub mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use http::HttpConnector;
pub use mock::{MockConnector, MockTransport};

// ============================================================================
// Types
// ============================================================================

/// Sending half of a transport signal channel.
pub type SignalSender = mpsc::UnboundedSender<TransportSignal>;

/// Receiving half of a transport signal channel.
pub type SignalReceiver = mpsc::UnboundedReceiver<TransportSignal>;

// ============================================================================
// ReadyState
// ============================================================================

/// Readiness of a connection or transport.
///
/// Moves forward only: `Connecting → Open → Closed`, with `Closed` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ReadyState {
    /// Created, open signal not yet processed.
    #[default]
    Connecting,
    /// Open signal processed.
    Open,
    /// Failed or explicitly closed.
    Closed,
}

impl ReadyState {
    /// Returns the numeric `readyState` used by event-source APIs.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closed => 2,
        }
    }

    /// Returns the state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

/// A named message delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Event name (`message` when the stream did not name it).
    pub event: String,
    /// Payload.
    pub data: String,
    /// Last event ID seen on the stream, if any.
    pub last_event_id: Option<String>,
}

impl MessageEvent {
    /// Creates a message event without an ID.
    #[inline]
    #[must_use]
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            last_event_id: None,
        }
    }
}

// ============================================================================
// TransportSignal
// ============================================================================

/// Signal reported by a transport to its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// The stream is established.
    Open,
    /// A message arrived.
    Message(MessageEvent),
    /// The stream failed.
    Error {
        /// Description of the failure.
        message: String,
    },
}

impl TransportSignal {
    /// Creates an error signal.
    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Handle to one underlying push stream.
pub trait Transport: Send + Sync {
    /// Returns the URL this transport was opened for.
    fn url(&self) -> &str;

    /// Stops the stream. Must be idempotent.
    fn close(&self);
}

// ============================================================================
// Connector
// ============================================================================

/// Opens transports.
///
/// `connect` must not block: establishment and failures are reported later
/// on the returned signal channel, never as a return value.
pub trait Connector: Send + Sync {
    /// Opens a transport for `url`.
    fn connect(&self, url: &str) -> (Box<dyn Transport>, SignalReceiver);
}

// ============================================================================
// Tests
// ============================================================================

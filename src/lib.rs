//! htmx SSE - Server-sent event subscriptions for attribute-driven pages.
//!
//! This library lets markup elements declare a persistent server-push
//! subscription, multiplex named event streams over one shared connection
//! per URL, swap element content on named events, and let other elements
//! issue requests when a named event arrives.
//!
//! # Architecture
//!
//! - **Host**: the page, seen through the [`Host`] trait (tree, attributes,
//!   content swap, request issuance, custom events)
//! - **Extension**: [`SseExtension`] reads `hx-sse` / `hx-trigger`
//!   attributes and wires elements to connections
//! - **Connection**: one [`Connection`] per URL, shared by every
//!   subscribing element, driven by its own event loop task
//!
//! Key design principles:
//!
//! - [`Registry`] returns the same [`Connection`] for the same URL
//! - `htmx:sse:open` fires at most once per connection, never synchronously
//! - A closed connection drops every later message
//! - Callback failures are logged and never stop fan-out
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use htmx_sse::{HttpConnector, MemoryDom, Result, SseExtension, SseOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = SseOptions::new().with_base_url("http://localhost:3000")?;
//!     let dom = Arc::new(MemoryDom::new());
//!
//!     let extension = SseExtension::builder()
//!         .host(dom.clone())
//!         .connector(Arc::new(HttpConnector::from_options(&options)?))
//!         .options(options)
//!         .build()?;
//!
//!     let div = dom.create_element(None);
//!     dom.set_attribute(&div, "hx-sse", "connect:/events swap:chat")?;
//!     extension.process(&div);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Attribute grammar and extension options |
//! | [`connection`] | [`Connection`] state machine and [`Registry`] |
//! | [`dispatch`] | Swap, trigger and lifecycle dispatch |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`extension`] | [`SseExtension`] element processing and cleanup |
//! | [`host`] | [`Host`] trait and [`MemoryDom`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`transport`] | Event-stream transports |

// ============================================================================
// Modules
// ============================================================================

/// Subscription and trigger grammars, extension options.
pub mod config;

/// Shared connections and the URL registry.
///
/// Use [`Registry::get_or_create`] to obtain the connection for a URL.
pub mod connection;

/// Swap, trigger and lifecycle dispatch.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Element processing, bindings and cleanup.
pub mod extension;

/// Host document collaborators.
pub mod host;

/// Type-safe identifiers.
pub mod identifiers;

/// Push-stream transports.
///
/// HTTP for real streams, mock for tests.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{DEFAULT_SWAP_EVENT, SseConfig, SseOptions, TriggerSpec};

// Connection types
pub use connection::{Connection, Listener, Registry};

// Dispatch types
pub use dispatch::{ERROR_EVENT, LifecycleDispatcher, OPEN_EVENT, SwapDispatcher, TriggerBridge};

// Error types
pub use error::{Error, Result};

// Extension types
pub use extension::{ElementBinding, SseExtension, SseExtensionBuilder};

// Host types
pub use host::{Host, MemoryDom};

// Identifier types
pub use identifiers::{ElementId, ListenerId};

// Transport types
pub use transport::{
    Connector, HttpConnector, MessageEvent, MockConnector, MockTransport, ReadyState, Transport,
    TransportSignal,
};

//! Element-facing extension layer.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SseExtension`] | Processes elements and owns all shared state |
//! | [`SseExtensionBuilder`] | Fluent configuration builder |
//! | [`ElementBinding`] | One element's subscription |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use htmx_sse::{MemoryDom, MockConnector, SseExtension};
//!
//! let dom = Arc::new(MemoryDom::new());
//! let connector = Arc::new(MockConnector::new());
//! let extension = SseExtension::builder()
//!     .host(dom.clone())
//!     .connector(connector.clone())
//!     .build()?;
//!
//! let div = dom.create_element(None);
//! dom.set_attribute(&div, "hx-sse", "connect:/events swap:chat")?;
//! extension.process(&div);
//!
//! connector.transport("/events").unwrap().simulate_message("chat", "<b>hi</b>");
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Per-element subscription state.
pub mod binding;

/// Fluent builder for extension configuration.
pub mod builder;

/// Global connection teardown.
pub mod cleanup;

/// Element processing and teardown.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use binding::ElementBinding;
pub use builder::SseExtensionBuilder;
pub use core::SseExtension;

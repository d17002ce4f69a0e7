//! Message and lifecycle dispatch.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `lifecycle` | `htmx:sse:open` / `htmx:sse:error` custom events |
//! | `swap` | Content replacement on named messages |
//! | `trigger` | Request issuance on `sse:<event>` triggers |
//!
//! Every callback failure is logged where it is dispatched; one failing
//! element never blocks delivery to the others.

// ============================================================================
// Submodules
// ============================================================================

/// Lifecycle custom events.
pub mod lifecycle;

/// Swap listeners.
pub mod swap;

/// Trigger listeners.
pub mod trigger;

// ============================================================================
// Re-exports
// ============================================================================

pub use lifecycle::{ERROR_EVENT, LifecycleDispatcher, OPEN_EVENT};
pub use swap::SwapDispatcher;
pub use trigger::TriggerBridge;

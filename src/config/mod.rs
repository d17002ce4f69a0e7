//! Configuration parsed at the crate boundary.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SseConfig`] | `connect:<url> swap:<name>...` subscription attribute |
//! | [`TriggerSpec`] | `sse:<name>` entries of a trigger attribute |
//! | [`SseOptions`] | Extension runtime options |

// ============================================================================
// Submodules
// ============================================================================

/// Subscription attribute grammar.
pub mod attribute;

/// Extension runtime options.
pub mod options;

/// Trigger attribute grammar.
pub mod trigger;

// ============================================================================
// Re-exports
// ============================================================================

pub use attribute::{DEFAULT_SWAP_EVENT, SseConfig};
pub use options::SseOptions;
pub use trigger::TriggerSpec;

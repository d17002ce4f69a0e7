//! Global teardown.
//!
//! Closes every connection and forgets every subscription, returning the
//! extension to its freshly built state. Intended for page teardown and
//! test isolation.

// ============================================================================
// Imports
// ============================================================================

use tracing::info;

use super::core::SseExtension;

// ============================================================================
// SseExtension - Cleanup
// ============================================================================

impl SseExtension {
    /// Closes all connections and clears all element state.
    ///
    /// Idempotent. No `htmx:sse:error` events are dispatched. Processing an
    /// element afterwards opens a brand-new connection.
    pub fn cleanup_all_connections(&self) {
        let connections = self.inner.registry.close_all();

        let bindings = {
            let mut bindings = self.inner.bindings.lock();
            let count = bindings.len();
            bindings.clear();
            count
        };
        let triggers = self.inner.triggers.clear();

        if connections + bindings + triggers > 0 {
            info!(connections, bindings, triggers, "All connections cleaned up");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Lifecycle custom events.
//!
//! Emits `htmx:sse:open` and `htmx:sse:error` on the elements bound to a
//! connection. At-most-once open firing is enforced by the connection; this
//! dispatcher only fans the event out and absorbs host failures.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::host::Host;
use crate::identifiers::ElementId;

// ============================================================================
// Constants
// ============================================================================

/// Fired once per connection when the stream opens.
pub const OPEN_EVENT: &str = "htmx:sse:open";

/// Fired on every transport error signal.
pub const ERROR_EVENT: &str = "htmx:sse:error";

// ============================================================================
// LifecycleDispatcher
// ============================================================================

/// Dispatches lifecycle events through the host.
#[derive(Clone)]
pub struct LifecycleDispatcher {
    host: Arc<dyn Host>,
}

impl fmt::Debug for LifecycleDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleDispatcher").finish_non_exhaustive()
    }
}

impl LifecycleDispatcher {
    /// Creates a dispatcher for `host`.
    #[inline]
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    /// Fires `htmx:sse:open` on each element.
    pub fn dispatch_open(&self, url: &str, elements: &[ElementId]) {
        self.dispatch(OPEN_EVENT, url, elements);
    }

    /// Fires `htmx:sse:error` on each element.
    pub fn dispatch_error(&self, url: &str, elements: &[ElementId]) {
        self.dispatch(ERROR_EVENT, url, elements);
    }

    fn dispatch(&self, event: &str, url: &str, elements: &[ElementId]) {
        debug!(url, event, count = elements.len(), "Dispatching lifecycle event");

        for element in elements {
            if let Err(e) = self.host.dispatch_event(element, event) {
                warn!(url, event, %element, error = %e, "Lifecycle listener failed");
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

    use crate::error::Error;
    use crate::host::MemoryDom;

    #[test]
    fn test_failure_does_not_stop_fan_out() {
        let dom = Arc::new(MemoryDom::new());
        let first = dom.create_element(None);
        let second = dom.create_element(None);
        dom.on_event(&first, ERROR_EVENT, || Err(Error::listener("handler threw")))
            .unwrap();

        let dispatcher = LifecycleDispatcher::new(dom.clone());
        dispatcher.dispatch_error("/events", &[first.clone(), second.clone()]);

        assert_eq!(dom.event_count(&first, ERROR_EVENT), 1);
        assert_eq!(dom.event_count(&second, ERROR_EVENT), 1);
    }

    #[test]
    fn test_unknown_element_is_skipped() {
        let dom = Arc::new(MemoryDom::new());
        let known = dom.create_element(None);

        let dispatcher = LifecycleDispatcher::new(dom.clone());
        dispatcher.dispatch_open("/events", &[ElementId::new("gone"), known.clone()]);

        assert_eq!(dom.events(&known), vec![OPEN_EVENT.to_string()]);
    }
}

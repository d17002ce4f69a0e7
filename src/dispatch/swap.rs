//! Message-to-content swapping.
//!
//! Each bound element gets one listener per swap event name. A listener
//! replaces the element's content with the message payload. Swaps targeting
//! the same element are serialized through the binding's guard.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::connection::Connection;
use crate::host::Host;
use crate::identifiers::{ElementId, ListenerId};
use crate::transport::MessageEvent;

// ============================================================================
// SwapDispatcher
// ============================================================================

/// Registers swap listeners on connections.
pub struct SwapDispatcher {
    host: Arc<dyn Host>,
}

impl fmt::Debug for SwapDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapDispatcher").finish_non_exhaustive()
    }
}

impl SwapDispatcher {
    /// Creates a dispatcher for `host`.
    #[inline]
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self { host }
    }

    /// Adds one swap listener per event name for `element`.
    ///
    /// Returns the listener IDs in `events` order. Duplicate names in
    /// `events` register duplicate listeners; callers pass a deduplicated
    /// list.
    pub fn register(
        &self,
        connection: &Connection,
        element: &ElementId,
        events: &[String],
        guard: &Arc<Mutex<()>>,
    ) -> Vec<ListenerId> {
        events
            .iter()
            .map(|event| {
                let host = Arc::clone(&self.host);
                let target = element.clone();
                let guard = Arc::clone(guard);

                connection.add_event_listener(event.clone(), move |message: &MessageEvent| {
                    let _exclusive = guard.lock();
                    trace!(element = %target, event = %message.event, "Swap");
                    host.swap(&target, &message.data)
                })
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::dispatch::LifecycleDispatcher;
    use crate::host::MemoryDom;
    use crate::transport::MockConnector;

    #[tokio::test]
    async fn test_swaps_only_on_registered_events() {
        let dom = Arc::new(MemoryDom::new());
        let connector = MockConnector::new();
        let connection = Connection::open(
            "/events",
            &connector,
            LifecycleDispatcher::new(dom.clone()),
        );

        let div = dom.create_element(None);
        dom.set_content(&div, "Waiting...").unwrap();

        let swaps = SwapDispatcher::new(dom.clone());
        let guard = Arc::new(Mutex::new(()));
        let ids = swaps.register(
            &connection,
            &div,
            &["chat".to_string(), "news".to_string()],
            &guard,
        );
        assert_eq!(ids.len(), 2);
        assert_eq!(connection.listener_count("chat"), 1);

        let transport = connector.transport("/events").unwrap();
        transport.simulate_message("chat", "<div>Chat message</div>");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dom.content(&div).as_deref(), Some("<div>Chat message</div>"));

        transport.simulate_message("other", "<div>Ignored</div>");
        transport.simulate_message("news", "<div>News update</div>");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(dom.content(&div).as_deref(), Some("<div>News update</div>"));
    }

    #[tokio::test]
    async fn test_removed_element_does_not_stop_others() {
        let dom = Arc::new(MemoryDom::new());
        let connector = MockConnector::new();
        let connection = Connection::open(
            "/events",
            &connector,
            LifecycleDispatcher::new(dom.clone()),
        );

        let gone = dom.create_element(None);
        let kept = dom.create_element(None);
        let swaps = SwapDispatcher::new(dom.clone());
        let events = ["message".to_string()];
        swaps.register(&connection, &gone, &events, &Arc::new(Mutex::new(())));
        swaps.register(&connection, &kept, &events, &Arc::new(Mutex::new(())));
        dom.remove_element(&gone);

        connector
            .transport("/events")
            .unwrap()
            .simulate_message("", "<p>fresh</p>");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(dom.content(&kept).as_deref(), Some("<p>fresh</p>"));
    }
}

//! Per-element subscription state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::config::SseConfig;
use crate::connection::Connection;
use crate::identifiers::{ElementId, ListenerId};

// ============================================================================
// ElementBinding
// ============================================================================

/// The link between one subscribing element and its connection.
#[derive(Clone)]
pub struct ElementBinding {
    element: ElementId,
    config: SseConfig,
    connection: Connection,
    swap_events: Vec<String>,
    listeners: Vec<ListenerId>,
}

impl fmt::Debug for ElementBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementBinding")
            .field("element", &self.element)
            .field("url", &self.config.url())
            .field("swap_events", &self.swap_events)
            .finish_non_exhaustive()
    }
}

impl ElementBinding {
    pub(crate) fn new(
        element: ElementId,
        config: SseConfig,
        connection: Connection,
        swap_events: Vec<String>,
        listeners: Vec<ListenerId>,
    ) -> Self {
        Self {
            element,
            config,
            connection,
            swap_events,
            listeners,
        }
    }

    /// Returns the subscribing element.
    #[inline]
    #[must_use]
    pub fn element(&self) -> &ElementId {
        &self.element
    }

    /// Returns the parsed subscription attribute.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SseConfig {
        &self.config
    }

    /// Returns the shared connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Returns the event names that swap into this element.
    #[inline]
    #[must_use]
    pub fn swap_events(&self) -> &[String] {
        &self.swap_events
    }

    /// Returns the swap listener IDs.
    #[inline]
    #[must_use]
    pub fn listener_ids(&self) -> &[ListenerId] {
        &self.listeners
    }

    /// Detaches the element from its connection.
    ///
    /// The connection itself stays open for other subscribers.
    pub(crate) fn release(&self) {
        for id in &self.listeners {
            self.connection.remove_event_listener(*id);
        }
        self.connection.unbind(&self.element);
    }
}

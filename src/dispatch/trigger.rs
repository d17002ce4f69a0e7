//! `sse:<event>` trigger bridge.
//!
//! An element whose trigger attribute names `sse:<event>` issues its
//! request each time `<event>` arrives on the connection of its nearest
//! ancestor-or-self subscription. The payload is discarded.
//!
//! Registration is idempotent per `(element, event)` pair, so processing
//! the same subtree twice never doubles the requests.
//! A registration follows resolution: if the nearest subscription now
//! belongs to another connection, the old listener is removed first.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::identifiers::{ElementId, ListenerId};
use crate::transport::MessageEvent;

// ============================================================================
// Types
// ============================================================================

/// Key of one trigger registration.
type TriggerKey = (ElementId, String);

/// Listener installed for one trigger.
struct TriggerRegistration {
    connection: Connection,
    listener: ListenerId,
}

impl TriggerRegistration {
    fn release(&self) {
        self.connection.remove_event_listener(self.listener);
    }
}

// ============================================================================
// TriggerBridge
// ============================================================================

/// Turns push events into request triggers.
pub struct TriggerBridge {
    host: Arc<dyn Host>,
    registrations: Mutex<FxHashMap<TriggerKey, TriggerRegistration>>,
}

impl fmt::Debug for TriggerBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerBridge")
            .field("registrations", &self.len())
            .finish_non_exhaustive()
    }
}

impl TriggerBridge {
    /// Creates a bridge for `host`.
    #[must_use]
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            host,
            registrations: Mutex::new(FxHashMap::default()),
        }
    }

    /// Finds the connection of the nearest ancestor-or-self subscription.
    ///
    /// `lookup` maps an element to its active connection, if any.
    pub fn resolve<F>(&self, element: &ElementId, lookup: F) -> Option<Connection>
    where
        F: Fn(&ElementId) -> Option<Connection>,
    {
        let mut current = Some(element.clone());
        while let Some(id) = current {
            if let Some(connection) = lookup(&id) {
                return Some(connection);
            }
            current = self.host.parent(&id);
        }
        None
    }

    /// Registers a trigger for `event` on `element`.
    ///
    /// Returns `Ok(false)` if the pair is already registered on the
    /// connection it currently resolves to and that connection is still
    /// live. A registration on a closed or no longer resolved connection is
    /// released and replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSubscription`] if no ancestor-or-self element
    /// has an active subscription. Any previous registration of the pair is
    /// released in that case.
    pub fn register<F>(&self, element: &ElementId, event: &str, lookup: F) -> Result<bool>
    where
        F: Fn(&ElementId) -> Option<Connection>,
    {
        let key = (element.clone(), event.to_string());
        let resolved = self.resolve(element, lookup);

        let stale = {
            let mut registrations = self.registrations.lock();
            let current = registrations.get(&key).map(|existing| {
                !existing.connection.is_closed()
                    && resolved
                        .as_ref()
                        .is_some_and(|c| Connection::ptr_eq(c, &existing.connection))
            });
            match current {
                Some(true) => return Ok(false),
                Some(false) => registrations.remove(&key),
                None => None,
            }
        };
        if let Some(stale) = stale {
            debug!(%element, event, url = stale.connection.url(), "Releasing stale trigger");
            stale.release();
        }

        let connection = resolved.ok_or_else(|| Error::no_subscription(element.clone()))?;

        let host = Arc::clone(&self.host);
        let target = element.clone();
        let listener = connection.add_event_listener(event, move |message: &MessageEvent| {
            trace!(element = %target, event = %message.event, "Trigger fired");
            host.issue_request(&target)
        });

        let mut registrations = self.registrations.lock();
        if registrations.contains_key(&key) {
            drop(registrations);
            connection.remove_event_listener(listener);
            return Ok(false);
        }

        debug!(%element, event, url = connection.url(), "Trigger registered");
        registrations.insert(key, TriggerRegistration { connection, listener });
        Ok(true)
    }

    /// Returns `true` if `element` has a trigger for `event`.
    #[must_use]
    pub fn is_registered(&self, element: &ElementId, event: &str) -> bool {
        self.registrations
            .lock()
            .contains_key(&(element.clone(), event.to_string()))
    }

    /// Returns the events `element` has triggers for.
    #[must_use]
    pub fn events_for(&self, element: &ElementId) -> Vec<String> {
        self.registrations
            .lock()
            .keys()
            .filter(|(id, _)| id == element)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Removes the trigger for `event` on `element`.
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister(&self, element: &ElementId, event: &str) -> bool {
        let removed = self
            .registrations
            .lock()
            .remove(&(element.clone(), event.to_string()));

        match removed {
            Some(registration) => {
                registration.release();
                true
            }
            None => false,
        }
    }

    /// Removes every trigger of `element`. Returns the number removed.
    pub fn unregister_element(&self, element: &ElementId) -> usize {
        let removed: Vec<TriggerRegistration> = {
            let mut registrations = self.registrations.lock();
            let keys: Vec<TriggerKey> = registrations
                .keys()
                .filter(|(id, _)| id == element)
                .cloned()
                .collect();
            keys.iter()
                .filter_map(|key| registrations.remove(key))
                .collect()
        };

        for registration in &removed {
            registration.release();
        }
        removed.len()
    }

    /// Removes every trigger. Returns the number removed.
    pub fn clear(&self) -> usize {
        let removed: Vec<TriggerRegistration> = self
            .registrations
            .lock()
            .drain()
            .map(|(_, registration)| registration)
            .collect();

        for registration in &removed {
            registration.release();
        }
        removed.len()
    }

    /// Returns the number of registered triggers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.lock().len()
    }

    /// Returns `true` if no triggers are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.lock().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

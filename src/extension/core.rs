//! Extension entry point.
//!
//! [`SseExtension`] scans host elements for subscription and trigger
//! attributes, wires them to shared connections, and tears them down when
//! elements leave the document.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::{SseConfig, SseOptions, TriggerSpec};
use crate::connection::{Connection, Registry};
use crate::dispatch::{LifecycleDispatcher, SwapDispatcher, TriggerBridge};
use crate::error::{Error, Result};
use crate::host::Host;
use crate::identifiers::ElementId;
use crate::transport::Connector;

use super::binding::ElementBinding;
use super::builder::SseExtensionBuilder;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the extension.
pub(crate) struct ExtensionInner {
    pub(crate) options: SseOptions,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) registry: Registry,
    pub(crate) swaps: SwapDispatcher,
    pub(crate) triggers: TriggerBridge,
    /// Active subscriptions by element.
    pub(crate) bindings: Mutex<FxHashMap<ElementId, ElementBinding>>,
}

// ============================================================================
// SseExtension
// ============================================================================

/// Server-sent events extension for a host document.
///
/// Cloning yields another handle to the same extension state.
#[derive(Clone)]
pub struct SseExtension {
    pub(crate) inner: Arc<ExtensionInner>,
}

impl fmt::Debug for SseExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseExtension")
            .field("connections", &self.inner.registry.len())
            .field("bindings", &self.binding_count())
            .field("triggers", &self.inner.triggers.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SseExtension - Construction
// ============================================================================

impl SseExtension {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> SseExtensionBuilder {
        SseExtensionBuilder::new()
    }

    pub(crate) fn new(host: Arc<dyn Host>, connector: Arc<dyn Connector>, options: SseOptions) -> Self {
        let lifecycle = LifecycleDispatcher::new(Arc::clone(&host));

        Self {
            inner: Arc::new(ExtensionInner {
                registry: Registry::new(connector, lifecycle),
                swaps: SwapDispatcher::new(Arc::clone(&host)),
                triggers: TriggerBridge::new(Arc::clone(&host)),
                bindings: Mutex::new(FxHashMap::default()),
                options,
                host,
            }),
        }
    }
}

// ============================================================================
// SseExtension - Accessors
// ============================================================================

impl SseExtension {
    /// Returns the extension options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SseOptions {
        &self.inner.options
    }

    /// Returns the connection registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns the registered connection for `url`, if any.
    #[must_use]
    pub fn connection(&self, url: &str) -> Option<Connection> {
        self.inner.registry.get(url)
    }

    /// Returns the binding of a subscribing element.
    #[must_use]
    pub fn binding(&self, element: &ElementId) -> Option<ElementBinding> {
        self.inner.bindings.lock().get(element).cloned()
    }

    /// Returns `true` if `element` has an active subscription.
    #[must_use]
    pub fn is_bound(&self, element: &ElementId) -> bool {
        self.inner.bindings.lock().contains_key(element)
    }

    /// Returns the number of subscribing elements.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.lock().len()
    }

    /// Returns the number of registered `sse:` triggers.
    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.inner.triggers.len()
    }
}

// ============================================================================
// SseExtension - Processing
// ============================================================================

impl SseExtension {
    /// Processes `root` and its descendants in document order.
    ///
    /// Must be called within a tokio runtime. Elements with malformed
    /// attributes or unresolvable triggers are logged and skipped.
    ///
    /// Returns the number of elements skipped.
    pub fn process(&self, root: &ElementId) -> usize {
        let mut skipped = 0;

        for element in self.subtree(root) {
            if let Err(e) = self.process_element(&element) {
                skipped += 1;
                if matches!(e, Error::NoSubscription { .. }) {
                    debug!(%element, error = %e, "Skipping trigger");
                } else {
                    warn!(%element, error = %e, "Skipping element");
                }
            }
        }

        debug!(%root, skipped, "Subtree processed");
        skipped
    }

    /// Processes a single element.
    ///
    /// The subscription attribute is handled before the trigger attribute,
    /// so an element may trigger on its own connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the subscription attribute is malformed
    /// - [`Error::InvalidTrigger`] if the trigger attribute is malformed
    /// - [`Error::NoSubscription`] if an `sse:` trigger has no
    ///   ancestor-or-self subscription
    pub fn process_element(&self, element: &ElementId) -> Result<()> {
        let subscription = self.process_subscription(element);
        let triggers = self.process_triggers(element);
        subscription.and(triggers)
    }

    fn process_subscription(&self, element: &ElementId) -> Result<()> {
        let Some(value) = self.first_attribute(element, &self.inner.options.attribute_names) else {
            return Ok(());
        };
        let config = SseConfig::parse(&value)?;

        let displaced = {
            let mut bindings = self.inner.bindings.lock();
            let unchanged = bindings
                .get(element)
                .map(|existing| existing.config() == &config);
            match unchanged {
                Some(true) => {
                    debug!(%element, url = config.url(), "Already subscribed");
                    return Ok(());
                }
                Some(false) => bindings.remove(element),
                None => None,
            }
        };
        if let Some(old) = displaced {
            debug!(%element, old = old.config().url(), new = config.url(), "Subscription changed");
            old.release();
        }

        let connection = self.inner.registry.get_or_create(config.url());
        let swap_events = config.swap_events(&self.inner.options.default_swap_event);
        let guard = Arc::new(Mutex::new(()));
        let listeners = self
            .inner
            .swaps
            .register(&connection, element, &swap_events, &guard);
        connection.bind(element);

        info!(%element, url = config.url(), events = ?swap_events, "Element subscribed");

        let binding = ElementBinding::new(element.clone(), config, connection, swap_events, listeners);
        let replaced = self.inner.bindings.lock().insert(element.clone(), binding);
        if let Some(replaced) = replaced {
            replaced.release();
        }
        Ok(())
    }

    /// Reconciles the element's `sse:` triggers with its trigger attribute.
    ///
    /// Triggers no longer named by the attribute are removed; a missing
    /// attribute removes them all.
    fn process_triggers(&self, element: &ElementId) -> Result<()> {
        let Some(value) =
            self.first_attribute(element, &self.inner.options.trigger_attribute_names)
        else {
            self.inner.triggers.unregister_element(element);
            return Ok(());
        };

        let specs = TriggerSpec::parse_list(&value)?;
        let events: Vec<&str> = specs.iter().filter_map(TriggerSpec::sse_event).collect();

        for existing in self.inner.triggers.events_for(element) {
            if !events.contains(&existing.as_str()) {
                debug!(%element, event = %existing, "Trigger removed from attribute");
                self.inner.triggers.unregister(element, &existing);
            }
        }

        for event in events {
            self.inner
                .triggers
                .register(element, event, |id| self.bound_connection(id))?;
        }
        Ok(())
    }

    fn bound_connection(&self, element: &ElementId) -> Option<Connection> {
        self.inner
            .bindings
            .lock()
            .get(element)
            .map(|binding| binding.connection().clone())
    }

    fn first_attribute(&self, element: &ElementId, names: &[String]) -> Option<String> {
        names
            .iter()
            .find_map(|name| self.inner.host.attribute(element, name))
    }

    /// Collects `root` and its descendants in document order.
    fn subtree(&self, root: &ElementId) -> Vec<ElementId> {
        let mut order = Vec::new();
        let mut stack = vec![root.clone()];

        while let Some(id) = stack.pop() {
            stack.extend(self.inner.host.children(&id).into_iter().rev());
            order.push(id);
        }
        order
    }
}

// ============================================================================
// SseExtension - Teardown
// ============================================================================

impl SseExtension {
    /// Detaches `root` and its descendants from their connections.
    ///
    /// Call before the host removes the elements. Connections stay open for
    /// other subscribers. Returns the number of subscriptions released.
    pub fn remove_element(&self, root: &ElementId) -> usize {
        let mut released = 0;

        for element in self.subtree(root) {
            let binding = self.inner.bindings.lock().remove(&element);
            if let Some(binding) = binding {
                binding.release();
                released += 1;
            }
            self.inner.triggers.unregister_element(&element);
        }

        if released > 0 {
            debug!(%root, released, "Subscriptions released");
        }
        released
    }
}

// ============================================================================
// Tests
// ============================================================================

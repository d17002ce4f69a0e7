//! In-memory document.
//!
//! [`MemoryDom`] keeps an element tree with attributes and content, records
//! every custom event and request issued against each element, and runs
//! registered event listeners. It is enough of a document to drive the
//! extension without a browser.
//!
//! # Example
//!
//! ```ignore
//! use htmx_sse::MemoryDom;
//!
//! let dom = MemoryDom::new();
//! let div = dom.create_element(None);
//! dom.set_attribute(&div, "hx-sse", "connect:/events")?;
//! dom.on_event(&div, "htmx:sse:open", || Ok(()))?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ElementId;

use super::Host;

// ============================================================================
// Types
// ============================================================================

/// Callback run when a custom event is dispatched on an element.
type DomListener = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// One element of the tree.
#[derive(Default)]
struct Node {
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    attributes: FxHashMap<String, String>,
    content: String,
    events: Vec<String>,
    requests: usize,
    listeners: Vec<(String, DomListener)>,
}

// ============================================================================
// MemoryDom
// ============================================================================

/// Thread-safe in-memory element tree implementing [`Host`].
#[derive(Default)]
pub struct MemoryDom {
    nodes: Mutex<FxHashMap<ElementId, Node>>,
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDom")
            .field("elements", &self.nodes.lock().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// MemoryDom - Tree Construction
// ============================================================================

impl MemoryDom {
    /// Creates an empty document.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an element, appended to `parent` if given.
    ///
    /// An unknown parent leaves the new element detached.
    pub fn create_element(&self, parent: Option<&ElementId>) -> ElementId {
        let id = ElementId::generate();
        let mut nodes = self.nodes.lock();

        let parent = parent.filter(|p| nodes.contains_key(*p)).cloned();
        if let Some(parent_id) = &parent
            && let Some(parent_node) = nodes.get_mut(parent_id)
        {
            parent_node.children.push(id.clone());
        }

        nodes.insert(
            id.clone(),
            Node {
                parent,
                ..Node::default()
            },
        );
        id
    }

    /// Sets an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] for an unknown element.
    pub fn set_attribute(
        &self,
        element: &ElementId,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(element)
            .ok_or_else(|| Error::element_not_found(element.clone()))?;
        node.attributes.insert(name.into(), value.into());
        Ok(())
    }

    /// Sets an element's content directly, bypassing the swap path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] for an unknown element.
    pub fn set_content(&self, element: &ElementId, content: impl Into<String>) -> Result<()> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(element)
            .ok_or_else(|| Error::element_not_found(element.clone()))?;
        node.content = content.into();
        Ok(())
    }

    /// Detaches and deletes `element` and its descendants.
    ///
    /// Returns the removed IDs, root first.
    pub fn remove_element(&self, element: &ElementId) -> Vec<ElementId> {
        let mut nodes = self.nodes.lock();

        if let Some(parent_id) = nodes.get(element).and_then(|n| n.parent.clone())
            && let Some(parent) = nodes.get_mut(&parent_id)
        {
            parent.children.retain(|c| c != element);
        }

        let mut removed = Vec::new();
        let mut stack = vec![element.clone()];
        while let Some(id) = stack.pop() {
            if let Some(node) = nodes.remove(&id) {
                stack.extend(node.children.into_iter().rev());
                removed.push(id);
            }
        }
        removed
    }

    /// Registers a listener for a custom event on `element`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ElementNotFound`] for an unknown element.
    pub fn on_event<F>(&self, element: &ElementId, event: impl Into<String>, listener: F) -> Result<()>
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(element)
            .ok_or_else(|| Error::element_not_found(element.clone()))?;
        node.listeners.push((event.into(), Arc::new(listener)));
        Ok(())
    }
}

// ============================================================================
// MemoryDom - Inspection
// ============================================================================

impl MemoryDom {
    /// Returns the element's current content.
    #[must_use]
    pub fn content(&self, element: &ElementId) -> Option<String> {
        self.nodes.lock().get(element).map(|n| n.content.clone())
    }

    /// Returns every custom event dispatched on the element, in order.
    #[must_use]
    pub fn events(&self, element: &ElementId) -> Vec<String> {
        self.nodes
            .lock()
            .get(element)
            .map(|n| n.events.clone())
            .unwrap_or_default()
    }

    /// Returns how many times `event` was dispatched on the element.
    #[must_use]
    pub fn event_count(&self, element: &ElementId, event: &str) -> usize {
        self.nodes
            .lock()
            .get(element)
            .map_or(0, |n| n.events.iter().filter(|e| *e == event).count())
    }

    /// Returns how many requests were issued for the element.
    #[must_use]
    pub fn request_count(&self, element: &ElementId) -> usize {
        self.nodes.lock().get(element).map_or(0, |n| n.requests)
    }

    /// Returns `true` if the element exists.
    #[inline]
    #[must_use]
    pub fn contains(&self, element: &ElementId) -> bool {
        self.nodes.lock().contains_key(element)
    }
}

// ============================================================================
// Host Implementation
// ============================================================================

impl Host for MemoryDom {
    fn parent(&self, element: &ElementId) -> Option<ElementId> {
        self.nodes.lock().get(element).and_then(|n| n.parent.clone())
    }

    fn children(&self, element: &ElementId) -> Vec<ElementId> {
        self.nodes
            .lock()
            .get(element)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn attribute(&self, element: &ElementId, name: &str) -> Option<String> {
        self.nodes
            .lock()
            .get(element)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    fn swap(&self, element: &ElementId, html: &str) -> Result<()> {
        trace!(%element, len = html.len(), "Swapping content");
        self.set_content(element, html)
    }

    fn issue_request(&self, element: &ElementId) -> Result<()> {
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(element)
            .ok_or_else(|| Error::element_not_found(element.clone()))?;
        node.requests += 1;
        Ok(())
    }

    fn dispatch_event(&self, element: &ElementId, event: &str) -> Result<()> {
        // Listeners run outside the lock so they may call back into the document.
        let listeners: Vec<DomListener> = {
            let mut nodes = self.nodes.lock();
            let node = nodes
                .get_mut(element)
                .ok_or_else(|| Error::element_not_found(element.clone()))?;
            node.events.push(event.to_string());
            node.listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        let mut first_error = None;
        for listener in listeners {
            if let Err(e) = listener() {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_tree_navigation() {
        let dom = MemoryDom::new();
        let root = dom.create_element(None);
        let child = dom.create_element(Some(&root));
        let grandchild = dom.create_element(Some(&child));

        assert_eq!(dom.parent(&grandchild), Some(child.clone()));
        assert_eq!(dom.parent(&root), None);
        assert_eq!(dom.children(&root), vec![child]);
    }

    #[test]
    fn test_swap_replaces_content() {
        let dom = MemoryDom::new();
        let div = dom.create_element(None);
        dom.set_content(&div, "Waiting...").unwrap();

        dom.swap(&div, "<div>Chat message</div>").unwrap();
        dom.swap(&div, "<div>News update</div>").unwrap();

        assert_eq!(dom.content(&div).as_deref(), Some("<div>News update</div>"));
    }

    #[test]
    fn test_remove_subtree() {
        let dom = MemoryDom::new();
        let root = dom.create_element(None);
        let child = dom.create_element(Some(&root));
        let grandchild = dom.create_element(Some(&child));

        let removed = dom.remove_element(&child);
        assert_eq!(removed, vec![child.clone(), grandchild.clone()]);
        assert!(dom.children(&root).is_empty());
        assert!(!dom.contains(&grandchild));
    }

    #[test]
    fn test_dispatch_runs_all_listeners() {
        let dom = MemoryDom::new();
        let div = dom.create_element(None);
        let calls = Arc::new(AtomicUsize::new(0));

        dom.on_event(&div, "htmx:sse:open", || Err(Error::listener("boom")))
            .unwrap();
        let counter = Arc::clone(&calls);
        dom.on_event(&div, "htmx:sse:open", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        let result = dom.dispatch_event(&div, "htmx:sse:open");
        assert!(matches!(result, Err(Error::Listener { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(dom.event_count(&div, "htmx:sse:open"), 1);
    }

    #[test]
    fn test_unknown_element() {
        let dom = MemoryDom::new();
        let ghost = ElementId::new("ghost");
        assert!(dom.issue_request(&ghost).is_err());
        assert!(dom.set_attribute(&ghost, "hx-sse", "connect:/x").is_err());
        assert_eq!(dom.request_count(&ghost), 0);
    }
}

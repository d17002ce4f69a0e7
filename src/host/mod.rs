//! Host document collaborators.
//!
//! The extension never touches a document directly. Everything it needs
//! from the page (tree navigation, attributes, content swap, request
//! issuance, custom events) goes through the [`Host`] trait.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Host`] | Collaborator interface implemented by the embedding page |
//! | [`MemoryDom`] | In-memory document for headless use and tests |

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;
use crate::identifiers::ElementId;

// ============================================================================
// Submodules
// ============================================================================

/// In-memory document implementation.
pub mod memory;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::MemoryDom;

// ============================================================================
// Host
// ============================================================================

/// Collaborator interface consumed by the extension.
///
/// Implementations must be cheap to call from the connection event loop:
/// callbacks run on the scheduler thread that delivered the push event.
/// Errors returned from `swap`, `issue_request` and `dispatch_event` are
/// logged by the caller and never stop delivery to other elements.
pub trait Host: Send + Sync {
    /// Returns the parent of `element`, or `None` at the root.
    fn parent(&self, element: &ElementId) -> Option<ElementId>;

    /// Returns the children of `element` in document order.
    fn children(&self, element: &ElementId) -> Vec<ElementId>;

    /// Returns an attribute value.
    fn attribute(&self, element: &ElementId, name: &str) -> Option<String>;

    /// Replaces the element's content with `html`, keeping its identity.
    fn swap(&self, element: &ElementId, html: &str) -> Result<()>;

    /// Runs the standard request pipeline for `element`.
    fn issue_request(&self, element: &ElementId) -> Result<()>;

    /// Dispatches a custom event with no payload on `element`.
    fn dispatch_event(&self, element: &ElementId, event: &str) -> Result<()>;
}

//! Type-safe identifiers.
//!
//! Newtype wrappers keep element references and listener handles from
//! being mixed up at compile time.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ElementId
// ============================================================================

/// Identifies one element in the host document.
///
/// The host decides the format; [`ElementId::generate`] produces a UUID for
/// hosts that have no natural identity of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Creates an element ID from a host-provided string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random element ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Global counter for listener IDs.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle for a listener registered on a [`Connection`](crate::Connection).
///
/// Returned by `add_event_listener` and consumed by `remove_event_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates the next process-unique listener ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_id_display() {
        let id = ElementId::new("work-area");
        assert_eq!(id.to_string(), "work-area");
        assert_eq!(id.as_str(), "work-area");
    }

    #[test]
    fn test_generated_element_ids_differ() {
        assert_ne!(ElementId::generate(), ElementId::generate());
    }

    #[test]
    fn test_listener_ids_increase() {
        let first = ListenerId::generate();
        let second = ListenerId::generate();
        assert!(second.as_u64() > first.as_u64());
    }

    #[test]
    fn test_element_id_serializes_transparently() {
        let json = serde_json::to_string(&ElementId::new("btn")).unwrap();
        assert_eq!(json, "\"btn\"");
    }
}

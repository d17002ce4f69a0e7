//! URL-keyed connection registry.
//!
//! Guarantees at most one live [`Connection`] per URL string. URLs are
//! compared verbatim: `/events` and `/events/` are different keys.
//!
//! A connection that closed on a transport error stays registered until
//! [`Registry::remove`] or [`Registry::close_all`] runs, so later lookups
//! return the same closed instance.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::dispatch::LifecycleDispatcher;
use crate::transport::Connector;

use super::Connection;

// ============================================================================
// Registry
// ============================================================================

/// Shares one connection per URL across all subscribing elements.
pub struct Registry {
    connector: Arc<dyn Connector>,
    lifecycle: LifecycleDispatcher,
    connections: RwLock<FxHashMap<String, Connection>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("connections", &self.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, lifecycle: LifecycleDispatcher) -> Self {
        Self {
            connector,
            lifecycle,
            connections: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns the connection for `url`, opening one if none is registered.
    ///
    /// Must be called within a tokio runtime. Repeated calls with the same
    /// URL return the same instance. The open transition of a new
    /// connection is deferred, so elements bound right after this call
    /// still receive `htmx:sse:open`.
    pub fn get_or_create(&self, url: &str) -> Connection {
        if let Some(existing) = self.connections.read().get(url) {
            return existing.clone();
        }

        let connection = {
            let mut connections = self.connections.write();
            if let Some(existing) = connections.get(url) {
                return existing.clone();
            }

            let connection = Connection::open(url, self.connector.as_ref(), self.lifecycle.clone());
            connections.insert(url.to_string(), connection.clone());
            connection
        };

        info!(url, "Connection created");
        connection.schedule_open();
        connection
    }

    /// Returns the connection for `url` without creating one.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<Connection> {
        self.connections.read().get(url).cloned()
    }

    /// Returns the number of registered connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Returns `true` if no connections are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Returns the registered URLs.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.connections.read().keys().cloned().collect()
    }

    /// Closes and unregisters the connection for `url`.
    pub fn remove(&self, url: &str) -> Option<Connection> {
        let connection = self.connections.write().remove(url)?;
        connection.close();
        debug!(url, "Connection removed");
        Some(connection)
    }

    /// Closes every connection and empties the registry.
    ///
    /// Returns the number of connections closed.
    pub fn close_all(&self) -> usize {
        let connections: Vec<Connection> = {
            let mut map = self.connections.write();
            map.drain().map(|(_, connection)| connection).collect()
        };

        let count = connections.len();
        for connection in connections {
            connection.close();
        }

        if count > 0 {
            info!(count, "All connections closed");
        }
        count
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::host::MemoryDom;
    use crate::transport::MockConnector;

    fn registry() -> (Arc<MockConnector>, Registry) {
        let connector = Arc::new(MockConnector::new());
        let dom = Arc::new(MemoryDom::new());
        let registry = Registry::new(connector.clone(), LifecycleDispatcher::new(dom));
        (connector, registry)
    }

    #[tokio::test]
    async fn test_same_url_same_connection() {
        let (connector, registry) = registry();
        let a = registry.get_or_create("/events");
        let b = registry.get_or_create("/events");

        assert!(Connection::ptr_eq(&a, &b));
        assert_eq!(connector.connect_count("/events"), 1);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_urls_compared_verbatim() {
        let (connector, registry) = registry();
        let a = registry.get_or_create("/events");
        let b = registry.get_or_create("/events/");

        assert!(!Connection::ptr_eq(&a, &b));
        assert_eq!(connector.connect_count("/events"), 1);
        assert_eq!(connector.connect_count("/events/"), 1);

        let mut urls = registry.urls();
        urls.sort();
        assert_eq!(urls, ["/events", "/events/"]);
    }

    #[tokio::test]
    async fn test_closed_connection_stays_registered() {
        let (connector, registry) = registry();
        let a = registry.get_or_create("/events");
        connector.transport("/events").unwrap().simulate_error();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(a.is_closed());
        let b = registry.get_or_create("/events");
        assert!(Connection::ptr_eq(&a, &b));
        assert_eq!(connector.connect_count("/events"), 1);
    }

    #[tokio::test]
    async fn test_remove_closes() {
        let (connector, registry) = registry();
        let a = registry.get_or_create("/events");
        let removed = registry.remove("/events").unwrap();

        assert!(Connection::ptr_eq(&a, &removed));
        assert!(a.is_closed());
        assert!(registry.get("/events").is_none());
        assert!(registry.remove("/events").is_none());

        let b = registry.get_or_create("/events");
        assert!(!Connection::ptr_eq(&a, &b));
        assert_eq!(connector.connect_count("/events"), 2);
    }

    #[tokio::test]
    async fn test_close_all() {
        let (_connector, registry) = registry();
        let a = registry.get_or_create("/a");
        let b = registry.get_or_create("/b");

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
        assert!(a.is_closed());
        assert!(b.is_closed());
        assert_eq!(registry.close_all(), 0);
    }

    proptest! {
        #[test]
        fn test_get_or_create_identity(urls in proptest::collection::vec("/[a-z]{0,4}", 1..12)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (connector, registry) = registry();
                let first: Vec<Connection> = urls.iter().map(|u| registry.get_or_create(u)).collect();
                let second: Vec<Connection> = urls.iter().map(|u| registry.get_or_create(u)).collect();

                for (a, b) in first.iter().zip(&second) {
                    prop_assert!(Connection::ptr_eq(a, b));
                }
                for url in &urls {
                    prop_assert_eq!(connector.connect_count(url), 1);
                }
                Ok(())
            })?;
        }
    }
}

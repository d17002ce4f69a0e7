//! Builder pattern for extension configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use htmx_sse::{MemoryDom, MockConnector, SseExtension};
//!
//! let extension = SseExtension::builder()
//!     .host(Arc::new(MemoryDom::new()))
//!     .connector(Arc::new(MockConnector::new()))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::config::SseOptions;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::transport::Connector;

use super::core::SseExtension;

// ============================================================================
// SseExtensionBuilder
// ============================================================================

/// Builder for configuring an [`SseExtension`].
///
/// Use [`SseExtension::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct SseExtensionBuilder {
    /// Document collaborator.
    host: Option<Arc<dyn Host>>,
    /// Transport factory.
    connector: Option<Arc<dyn Connector>>,
    /// Attribute names and defaults.
    options: SseOptions,
}

impl fmt::Debug for SseExtensionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseExtensionBuilder")
            .field("host", &self.host.is_some())
            .field("connector", &self.connector.is_some())
            .field("options", &self.options)
            .finish()
    }
}

// ============================================================================
// SseExtensionBuilder Implementation
// ============================================================================

impl SseExtensionBuilder {
    /// Creates a builder with default options and no collaborators.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host document.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the transport connector.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replaces the options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: SseOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the extension.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host or connector is not set
    /// - [`Error::Config`] if the options fail validation
    pub fn build(self) -> Result<SseExtension> {
        let host = self.host.ok_or_else(|| {
            Error::config("Host is required. Use .host() to set the document collaborator.")
        })?;
        let connector = self.connector.ok_or_else(|| {
            Error::config(
                "Connector is required. Use .connector() with an HttpConnector or MockConnector.",
            )
        })?;
        self.options.validate()?;

        Ok(SseExtension::new(host, connector, self.options))
    }
}

// ============================================================================
// Tests
// ============================================================================

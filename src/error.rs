//! Error types for htmx-sse.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use htmx_sse::{Result, SseConfig};
//!
//! fn example(value: &str) -> Result<()> {
//!     let config = SseConfig::parse(value)?;
//!     println!("subscribing to {}", config.url());
//!     Ok(())
//! }
//! ```
//!
//! Transport failures are never returned to callers of
//! [`Registry::get_or_create`](crate::Registry::get_or_create). They surface
//! as the `htmx:sse:error` custom event and the CLOSED state instead.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidTrigger`] |
//! | Resolution | [`Error::NoSubscription`], [`Error::ElementNotFound`] |
//! | Connection | [`Error::Connection`] |
//! | Dispatch | [`Error::Listener`] |
//! | External | [`Error::Url`], [`Error::Json`], [`Error::Http`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::ElementId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Malformed subscription attribute or extension options.
    ///
    /// Returned when a `connect:` URL is missing or a token is unknown.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Malformed `sse:` trigger specification.
    #[error("Invalid trigger: {spec}")]
    InvalidTrigger {
        /// The offending trigger entry.
        spec: String,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// No ancestor-or-self element carries an active subscription.
    #[error("No subscription found for element {element_id} or its ancestors")]
    NoSubscription {
        /// Element whose trigger could not be resolved.
        element_id: ElementId,
    },

    /// Host does not know the element.
    #[error("Element not found: {element_id}")]
    ElementNotFound {
        /// The missing element's ID.
        element_id: ElementId,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport-level failure.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// A listener or host callback reported a failure.
    ///
    /// Caught and logged at the dispatch site; never aborts fan-out.
    #[error("Listener failed: {message}")]
    Listener {
        /// Description of the callback failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid trigger error.
    #[inline]
    pub fn invalid_trigger(spec: impl Into<String>) -> Self {
        Self::InvalidTrigger { spec: spec.into() }
    }

    /// Creates a missing subscription error.
    #[inline]
    pub fn no_subscription(element_id: ElementId) -> Self {
        Self::NoSubscription { element_id }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(element_id: ElementId) -> Self {
        Self::ElementNotFound { element_id }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a listener failure.
    #[inline]
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    ///
    /// Configuration errors skip the offending element and nothing else.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidTrigger { .. } | Self::Url(_) | Self::Json(_)
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Http(_))
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed when the element is processed again
    /// (for example once an ancestor subscription has been processed).
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoSubscription { .. } | Self::ElementNotFound { .. } | Self::Listener { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("stream ended");
        assert_eq!(err.to_string(), "Connection failed: stream ended");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing connect: URL");
        assert_eq!(err.to_string(), "Configuration error: missing connect: URL");
        assert!(err.is_config_error());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_no_subscription_display() {
        let err = Error::no_subscription(ElementId::new("btn"));
        assert_eq!(
            err.to_string(),
            "No subscription found for element btn or its ancestors"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(!Error::invalid_trigger("sse:").is_connection_error());
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
        assert!(err.is_config_error());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}

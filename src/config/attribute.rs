//! Subscription attribute grammar.
//!
//! Parses `connect:<url> [swap:<eventName>]*` into a validated
//! [`SseConfig`] at the boundary, so the rest of the crate never handles
//! raw attribute strings.
//!
//! # Example
//!
//! ```ignore
//! use htmx_sse::SseConfig;
//!
//! let config = SseConfig::parse("connect:/events swap:chat swap:news")?;
//! assert_eq!(config.url(), "/events");
//! assert_eq!(config.declared_swaps(), ["chat", "news"]);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Event name delivered for unnamed messages.
pub const DEFAULT_SWAP_EVENT: &str = "message";

/// Token prefix naming the subscription URL.
const CONNECT_PREFIX: &str = "connect:";

/// Token prefix naming a swap event.
const SWAP_PREFIX: &str = "swap:";

// ============================================================================
// SseConfig
// ============================================================================

/// Validated subscription declared by one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SseConfig {
    /// Subscription URL (registry key).
    url: String,
    /// Declared swap event names, deduplicated, in declaration order.
    swaps: Vec<String>,
}

impl SseConfig {
    /// Parses a subscription attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if:
    /// - no `connect:` token is present, or it names an empty URL
    /// - more than one `connect:` token is present
    /// - a `swap:` token names an empty event
    /// - any other token appears
    pub fn parse(value: &str) -> Result<Self> {
        let mut url: Option<String> = None;
        let mut swaps: Vec<String> = Vec::new();

        for token in value.split_whitespace() {
            if let Some(rest) = token.strip_prefix(CONNECT_PREFIX) {
                if rest.is_empty() {
                    return Err(Error::config("connect: requires a URL"));
                }
                if url.is_some() {
                    return Err(Error::config(format!(
                        "duplicate connect: token in {value:?}"
                    )));
                }
                url = Some(rest.to_string());
            } else if let Some(rest) = token.strip_prefix(SWAP_PREFIX) {
                if rest.is_empty() {
                    return Err(Error::config("swap: requires an event name"));
                }
                if !swaps.iter().any(|s| s == rest) {
                    swaps.push(rest.to_string());
                }
            } else {
                return Err(Error::config(format!("unknown token {token:?}")));
            }
        }

        let url = url.ok_or_else(|| Error::config(format!("missing connect: URL in {value:?}")))?;
        Ok(Self { url, swaps })
    }

    /// Returns the subscription URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the swap names exactly as declared.
    #[inline]
    #[must_use]
    pub fn declared_swaps(&self) -> &[String] {
        &self.swaps
    }

    /// Returns the event names this element swaps on.
    ///
    /// Falls back to `default_event` when no `swap:` token was declared.
    #[must_use]
    pub fn swap_events(&self, default_event: &str) -> Vec<String> {
        if self.swaps.is_empty() {
            vec![default_event.to_string()]
        } else {
            self.swaps.clone()
        }
    }
}

impl FromStr for SseConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONNECT_PREFIX}{}", self.url)?;
        for swap in &self.swaps {
            write!(f, " {SWAP_PREFIX}{swap}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

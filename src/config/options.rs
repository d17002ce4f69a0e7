//! Runtime options for the extension.
//!
//! Options can be built in code or read from the JSON shape a page carries
//! in its `htmx-config` meta tag.
//!
//! # Example
//!
//! ```ignore
//! use htmx_sse::SseOptions;
//!
//! let options = SseOptions::new()
//!     .with_base_url("http://localhost:3000")?
//!     .with_attribute_name("x-sse");
//!
//! let options = SseOptions::from_json(r#"{"defaultSwapEvent":"update"}"#)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

use super::attribute::DEFAULT_SWAP_EVENT;

// ============================================================================
// Constants
// ============================================================================

/// Subscription attribute spellings recognized by default.
const DEFAULT_ATTRIBUTE_NAMES: [&str; 2] = ["hx-sse", "data-hx-sse"];

/// Trigger attribute spellings recognized by default.
const DEFAULT_TRIGGER_ATTRIBUTE_NAMES: [&str; 2] = ["hx-trigger", "data-hx-trigger"];

// ============================================================================
// SseOptions
// ============================================================================

/// Extension configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SseOptions {
    /// Subscription attribute names, checked in order; the first present wins.
    pub attribute_names: Vec<String>,

    /// Trigger attribute names scanned for `sse:` entries.
    pub trigger_attribute_names: Vec<String>,

    /// Event name used when an element declares no `swap:` tokens.
    pub default_swap_event: String,

    /// Base URL for resolving relative subscription URLs over HTTP.
    pub base_url: Option<Url>,
}

impl Default for SseOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SseOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attribute_names: DEFAULT_ATTRIBUTE_NAMES.map(String::from).to_vec(),
            trigger_attribute_names: DEFAULT_TRIGGER_ATTRIBUTE_NAMES
                .map(String::from)
                .to_vec(),
            default_swap_event: DEFAULT_SWAP_EVENT.to_string(),
            base_url: None,
        }
    }

    /// Parses options from a JSON object.
    ///
    /// Missing keys keep their defaults; unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the text is not a valid options object
    /// - [`Error::Config`] if the resulting options fail validation
    pub fn from_json(text: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(text)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SseOptions {
    /// Adds an additional subscription attribute spelling.
    #[inline]
    #[must_use]
    pub fn with_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_names.push(name.into());
        self
    }

    /// Adds an additional trigger attribute spelling.
    #[inline]
    #[must_use]
    pub fn with_trigger_attribute_name(mut self, name: impl Into<String>) -> Self {
        self.trigger_attribute_names.push(name.into());
        self
    }

    /// Sets the implicit swap event name.
    #[inline]
    #[must_use]
    pub fn with_default_swap_event(mut self, event: impl Into<String>) -> Self {
        self.default_swap_event = event.into();
        self
    }

    /// Sets the base URL for relative subscription URLs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if `base` is not an absolute URL.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        self.base_url = Some(Url::parse(base)?);
        Ok(self)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SseOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no subscription attribute name is set,
    /// any name is blank, or the default swap event is blank.
    pub fn validate(&self) -> Result<()> {
        if self.attribute_names.is_empty() {
            return Err(Error::config("at least one subscription attribute name is required"));
        }

        if self
            .attribute_names
            .iter()
            .chain(&self.trigger_attribute_names)
            .any(|name| name.trim().is_empty())
        {
            return Err(Error::config("attribute names must not be blank"));
        }

        if self.default_swap_event.trim().is_empty() {
            return Err(Error::config("default swap event must not be blank"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SseOptions::new();
        assert_eq!(options.attribute_names, ["hx-sse", "data-hx-sse"]);
        assert_eq!(options.trigger_attribute_names, ["hx-trigger", "data-hx-trigger"]);
        assert_eq!(options.default_swap_event, "message");
        assert!(options.base_url.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = SseOptions::new()
            .with_attribute_name("x-sse")
            .with_default_swap_event("update")
            .with_base_url("http://localhost:3000")
            .unwrap();

        assert_eq!(options.attribute_names.len(), 3);
        assert_eq!(options.default_swap_event, "update");
        assert_eq!(
            options.base_url.as_ref().map(Url::as_str),
            Some("http://localhost:3000/")
        );
    }

    #[test]
    fn test_relative_base_url_rejected() {
        assert!(SseOptions::new().with_base_url("/events").is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let options =
            SseOptions::from_json(r#"{"defaultSwapEvent":"tick","historyEnabled":false}"#)
                .unwrap();
        assert_eq!(options.default_swap_event, "tick");
        assert_eq!(options.attribute_names, ["hx-sse", "data-hx-sse"]);
    }

    #[test]
    fn test_from_json_base_url() {
        let options = SseOptions::from_json(r#"{"baseUrl":"https://example.com/app/"}"#).unwrap();
        assert_eq!(
            options.base_url.map(|url| url.to_string()),
            Some("https://example.com/app/".to_string())
        );
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            SseOptions::from_json("not json"),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            SseOptions::from_json(r#"{"attributeNames":[]}"#),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_validate_blank_event() {
        let options = SseOptions::new().with_default_swap_event(" ");
        assert!(options.validate().is_err());
    }
}

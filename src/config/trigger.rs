//! `sse:<eventName>` trigger specifications.
//!
//! The generic trigger grammar is a comma-separated list of entries, each
//! starting with the trigger name followed by optional modifiers. Only the
//! `sse:` entries are meaningful here; everything else is passed through
//! as [`TriggerSpec::Other`].

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix marking a push-event trigger.
const SSE_PREFIX: &str = "sse:";

// ============================================================================
// TriggerSpec
// ============================================================================

/// One entry of a trigger attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSpec {
    /// Fire when the named push event is delivered.
    Sse {
        /// Event name to listen for.
        event: String,
    },

    /// Any non-push trigger (`click`, `every 1s`, ...).
    Other(String),
}

impl TriggerSpec {
    /// Parses a single trigger entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTrigger`] for an `sse:` entry without a name.
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        let head = entry.split_whitespace().next().unwrap_or_default();

        match head.strip_prefix(SSE_PREFIX) {
            Some("") => Err(Error::invalid_trigger(entry)),
            Some(event) => Ok(Self::Sse {
                event: event.to_string(),
            }),
            None => Ok(Self::Other(entry.to_string())),
        }
    }

    /// Parses a full comma-separated trigger attribute.
    ///
    /// Empty entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::InvalidTrigger`] encountered.
    pub fn parse_list(value: &str) -> Result<Vec<Self>> {
        value
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Returns the push event name if this is an `sse:` trigger.
    #[inline]
    #[must_use]
    pub fn sse_event(&self) -> Option<&str> {
        match self {
            Self::Sse { event } => Some(event),
            Self::Other(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_entry() {
        let spec = TriggerSpec::parse("sse:update").unwrap();
        assert_eq!(spec.sse_event(), Some("update"));
    }

    #[test]
    fn test_modifiers_are_ignored() {
        let spec = TriggerSpec::parse(" sse:update delay:1s ").unwrap();
        assert_eq!(
            spec,
            TriggerSpec::Sse {
                event: "update".into()
            }
        );
    }

    #[test]
    fn test_other_entry() {
        let spec = TriggerSpec::parse("every 1s").unwrap();
        assert_eq!(spec, TriggerSpec::Other("every 1s".into()));
        assert_eq!(spec.sse_event(), None);
    }

    #[test]
    fn test_empty_sse_name() {
        let err = TriggerSpec::parse("sse:").unwrap_err();
        assert!(matches!(err, Error::InvalidTrigger { .. }));
    }

    #[test]
    fn test_parse_list_mixed() {
        let specs = TriggerSpec::parse_list("click, sse:update, , sse:refresh once").unwrap();
        let events: Vec<_> = specs.iter().filter_map(TriggerSpec::sse_event).collect();
        assert_eq!(specs.len(), 3);
        assert_eq!(events, ["update", "refresh"]);
    }

    #[test]
    fn test_parse_list_rejects_bad_entry() {
        assert!(TriggerSpec::parse_list("click, sse:").is_err());
    }
}

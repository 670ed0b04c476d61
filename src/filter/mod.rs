//! Stop-prefix filtering over decoded feeds.
//!
//! Two projections share the same predicate:
//!
//! * [`per_stop`] fans trip-update and alert fragments out into one
//!   [`per_stop::StopBundle`] per matching stop;
//! * [`prune`] keeps a single feed, narrowed to the matching entities, plus
//!   [`crate::stats::FilterSummary`] counters.
//!
//! Both are pure functions of their input so independent feeds can be
//! processed in parallel and merged afterwards.

pub mod per_stop;
pub mod prune;

use crate::model::{EntitySelector, StopTimeUpdate};

/// A sub-record that may point at a stop.
pub trait StopReference {
    fn stop_id(&self) -> Option<&str>;
}

impl StopReference for StopTimeUpdate {
    fn stop_id(&self) -> Option<&str> {
        self.stop_id.as_deref()
    }
}

impl StopReference for EntitySelector {
    fn stop_id(&self) -> Option<&str> {
        self.stop_id.as_deref()
    }
}

/// Case-sensitive stop-id prefix match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopPrefix(String);

impl StopPrefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A missing stop id never matches.
    pub fn matches(&self, stop_id: Option<&str>) -> bool {
        stop_id.is_some_and(|id| id.starts_with(&self.0))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matches_at_start_only() {
        let prefix = StopPrefix::new("370");
        assert!(prefix.matches(Some("3701")));
        assert!(prefix.matches(Some("370")));
        assert!(!prefix.matches(Some("13701")));
        assert!(!prefix.matches(Some("37")));
        assert!(!prefix.matches(None));
    }

    #[test]
    fn test_prefix_is_case_sensitive() {
        let prefix = StopPrefix::new("ab");
        assert!(prefix.matches(Some("abc")));
        assert!(!prefix.matches(Some("ABC")));
    }

    #[test]
    fn test_empty_prefix_matches_every_stop_id() {
        let prefix = StopPrefix::new("");
        assert!(prefix.matches(Some("anything")));
        assert!(!prefix.matches(None));
    }
}

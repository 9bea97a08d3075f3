//! Topic names.
//!
//! Topics are hierarchical strings separated by `/`. Subscriptions match by
//! plain string prefix: a filter `"/foo"` receives `"/foo/bar"` and also
//! `"/foobar"`.

use std::borrow::Borrow;
use std::fmt;

/// Marker prefix of topics the messaging layer reserves for itself.
pub const RESERVED_PREFIX: &str = "<$>";

/// Reserved topic names.
pub mod topics {
    /// Status notifications emitted by an endpoint.
    pub const STATUSES: &str = "<$>/local/data/statuses";
    /// Error notifications emitted by an endpoint.
    pub const ERRORS: &str = "<$>/local/data/errors";
}

/// A topic name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Check whether this topic, used as a filter, matches `other`.
    #[must_use]
    pub fn prefix_of(&self, other: &str) -> bool {
        other.starts_with(&self.0)
    }

    /// Check whether the topic lives in the reserved namespace.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_PREFIX)
    }
}

impl From<&str> for Topic {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for Topic {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

impl From<&Topic> for Topic {
    fn from(t: &Topic) -> Self {
        t.clone()
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Topic {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Topic {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Topic {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching_is_plain_string_prefix() {
        let filter = Topic::from("/topic/");
        assert!(filter.prefix_of("/topic/test"));
        assert!(!filter.prefix_of("/topic"));
        assert!(Topic::from("/foo").prefix_of("/foobar"));
    }

    #[test]
    fn reserved_namespace() {
        assert!(Topic::from(topics::STATUSES).is_reserved());
        assert!(Topic::from(topics::ERRORS).is_reserved());
        assert!(!Topic::from("/test").is_reserved());
    }
}

use serde::{Deserialize, Serialize};
use std::{borrow::Borrow, fmt};

/// A fully-qualified hostname, possibly wildcarded with a leading `*`
/// (e.g. `*.example.com`, or `*` for every host).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hostname(String);

// === impl Hostname ===

impl Hostname {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.0.starts_with('*')
    }

    /// Returns true if the two names can refer to a common host.
    ///
    /// An exact name matches an equal name or a wildcard whose suffix ends it.
    /// Two wildcards match when the longer suffix ends with the shorter one,
    /// so `*.foo.global` matches `*.global`.
    pub fn matches(&self, other: &Hostname) -> bool {
        match (self.wildcard_suffix(), other.wildcard_suffix()) {
            (Some(mine), Some(theirs)) => {
                if mine.len() < theirs.len() {
                    theirs.ends_with(mine)
                } else {
                    mine.ends_with(theirs)
                }
            }
            (Some(suffix), None) => other.0.ends_with(suffix),
            (None, Some(suffix)) => self.0.ends_with(suffix),
            (None, None) => self.0 == other.0,
        }
    }

    fn wildcard_suffix(&self) -> Option<&str> {
        self.0.strip_prefix('*')
    }
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Hostname {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Hostname {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for Hostname {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Hostname {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matching() {
        for (a, b, expected) in [
            ("foo.global", "foo.global", true),
            ("foo.global", "bar.global", false),
            ("foo.global", "*.global", true),
            ("*.global", "foo.global", true),
            ("*.foo.global", "*.global", true),
            ("*.global", "*.foo.global", true),
            ("*.global", "*.local", false),
            ("fooglobal", "*.global", false),
            ("anything.example", "*", true),
            ("*", "*.example", true),
        ] {
            assert_eq!(
                Hostname::from(a).matches(&Hostname::from(b)),
                expected,
                "{a} ~ {b}"
            );
        }
    }

    #[test]
    fn wildcard_detection() {
        assert!(Hostname::from("*").is_wildcard());
        assert!(Hostname::from("*.global").is_wildcard());
        assert!(!Hostname::from("foo.global").is_wildcard());
    }
}

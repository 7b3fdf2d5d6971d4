//! Excluded-path matching.
//!
//! Request paths are normalized to end with `/` before comparison. A pattern
//! ending in `*` is a prefix pattern: the text before the `*` must prefix the
//! path and, unless it already ends with `/`, be followed by a `/` so that
//! `/status*` covers `/status/` and `/status/123/` but not `/statuses/`. Any
//! other pattern must equal the normalized path exactly.

use std::borrow::Cow;

#[derive(Clone, Debug, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, normalized: &str) -> bool {
        match self {
            Self::Exact(pattern) => pattern == normalized,
            Self::Prefix(prefix) => normalized.strip_prefix(prefix.as_str()).is_some_and(|rest| {
                prefix.ends_with('/') || rest.starts_with('/')
            }),
        }
    }
}

/// Ordered set of path patterns exempt from authentication.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExcludedPaths {
    patterns: Vec<PathPattern>,
}

impl ExcludedPaths {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|pattern| PathPattern::parse(pattern.as_ref()))
                .collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `path` needs credentials. Empty paths and empty sets fail closed.
    #[must_use]
    pub fn requires_auth(&self, path: &str) -> bool {
        if path.is_empty() || self.patterns.is_empty() {
            return true;
        }
        let normalized = normalize(path);
        !self
            .patterns
            .iter()
            .any(|pattern| pattern.matches(&normalized))
    }
}

fn normalize(path: &str) -> Cow<'_, str> {
    if path.ends_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("{path}/"))
    }
}

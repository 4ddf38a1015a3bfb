//! Compound cache key

use std::fmt;

/// Identifies one model: a task namespace plus a variant within it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    namespace: String,
    variant: String,
}

impl CacheKey {
    /// Build a key from its two parts
    pub fn new(namespace: impl Into<String>, variant: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            variant: variant.into(),
        }
    }

    /// Task namespace, e.g. `pos`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Variant, e.g. `ko`
    pub fn variant(&self) -> &str {
        &self.variant
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.variant)
    }
}

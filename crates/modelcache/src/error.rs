//! Error types for modelcache

use std::sync::Arc;

use thiserror::Error;

use crate::key::CacheKey;

/// Result type alias for registry lookups
pub type Result<T> = std::result::Result<T, Error>;

/// Raised by [`LruCache::get`](crate::LruCache::get) when the key has no entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key not found in cache")]
pub struct KeyNotFound;

/// Errors surfaced to callers of a registry
///
/// Cloneable so that every caller waiting on the same construction receives
/// the same outcome.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// No factory is registered for this namespace/variant
    #[error("unsupported variant '{variant}' for namespace '{namespace}'")]
    UnsupportedVariant {
        /// Requested namespace
        namespace: String,
        /// Requested variant
        variant: String,
    },

    /// The factory failed; nothing was cached
    #[error("failed to construct {key}: {source}")]
    ConstructionFailure {
        /// Model that failed to build
        key: CacheKey,
        /// Factory error
        #[source]
        source: Arc<modelstore::Error>,
    },
}

impl Error {
    pub(crate) fn unsupported(namespace: &str, variant: &str) -> Self {
        Error::UnsupportedVariant {
            namespace: namespace.to_string(),
            variant: variant.to_string(),
        }
    }

    /// True for errors caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::UnsupportedVariant { .. })
    }
}

//! # modelcache
//!
//! Bounded, shared cache of lazily constructed models.
//!
//! ## Architecture
//! - **LruCache**: logical-clock recency, evicts the oldest stamp
//! - **SharedCache**: LRU behind one bookkeeping lock, single-flight construction
//! - **Registry**: per-namespace variant → factory map over a shared cache
//! - **Registries**: `(namespace, variant)` lookup across all registries
//!
//! ```
//! use std::sync::Arc;
//! use modelcache::{Registry, SharedCache};
//! use modelstore::from_fn;
//!
//! let cache = Arc::new(SharedCache::new("default", 10));
//! let pos = Registry::new("pos", cache)
//!     .with_factory("ko", from_fn(|| Ok(String::from("korean tagger"))));
//!
//! assert_eq!(*pos.get("ko").unwrap(), "korean tagger");
//! assert!(pos.get("xx").is_err());
//! ```

#![warn(missing_docs)]

mod cache;
mod error;
mod key;
mod lru;
mod registry;
mod stats;

pub use cache::SharedCache;
pub use error::{Error, KeyNotFound, Result};
pub use key::CacheKey;
pub use lru::LruCache;
pub use registry::{Registries, Registry};
pub use stats::CacheStats;

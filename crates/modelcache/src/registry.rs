//! Lazy resource registries
//!
//! A [`Registry`] is the per-namespace view over a [`SharedCache`]: it knows
//! which variants exist and how to build each one, and defers storage to the
//! cache. [`Registries`] groups them so a caller can look up any model by
//! `(namespace, variant)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use modelstore::ModelFactory;
use tracing::info;

use crate::cache::SharedCache;
use crate::error::{Error, Result};
use crate::key::CacheKey;

type DynFactory<R> = Arc<dyn ModelFactory<Resource = R>>;

/// Lazily constructed models for one namespace
pub struct Registry<R> {
    namespace: String,
    factories: BTreeMap<String, DynFactory<R>>,
    cache: Arc<SharedCache<R>>,
}

impl<R: Send + Sync + 'static> Registry<R> {
    /// Empty registry for `namespace`, storing models in `cache`
    pub fn new(namespace: impl Into<String>, cache: Arc<SharedCache<R>>) -> Self {
        Self {
            namespace: namespace.into(),
            factories: BTreeMap::new(),
            cache,
        }
    }

    /// Register the factory for `variant`, replacing any previous one
    ///
    /// Replacing a factory drops the model built by the old one, so the next
    /// `get` constructs with the new factory.
    pub fn register<F>(&mut self, variant: impl Into<String>, factory: F)
    where
        F: ModelFactory<Resource = R> + 'static,
    {
        let variant = variant.into();
        let key = CacheKey::new(self.namespace.as_str(), variant.as_str());
        if self.factories.insert(variant, Arc::new(factory)).is_some() {
            self.cache.invalidate(&key);
        }
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_factory<F>(mut self, variant: impl Into<String>, factory: F) -> Self
    where
        F: ModelFactory<Resource = R> + 'static,
    {
        self.register(variant, factory);
        self
    }

    /// Return the model for `variant`, building it on first use
    pub fn get(&self, variant: &str) -> Result<Arc<R>> {
        let factory = self
            .factories
            .get(variant)
            .ok_or_else(|| Error::unsupported(&self.namespace, variant))?;

        let key = CacheKey::new(self.namespace.as_str(), variant);
        self.cache.get_or_construct(&key, &**factory)
    }

    /// Build `variant` now rather than on first request
    pub fn preload(&self, variant: &str) -> Result<()> {
        self.get(variant)?;
        info!(namespace = %self.namespace, variant, "preloaded model");
        Ok(())
    }

    /// True if `variant` is currently cached. Does not count as an access.
    pub fn is_cached(&self, variant: &str) -> bool {
        self.factories.contains_key(variant)
            && self
                .cache
                .contains(&CacheKey::new(self.namespace.as_str(), variant))
    }

    /// Registered variants, sorted
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Namespace served by this registry
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Cache backing this registry
    pub fn cache(&self) -> &Arc<SharedCache<R>> {
        &self.cache
    }
}

/// All registries of a process, keyed by namespace
pub struct Registries<R> {
    registries: BTreeMap<String, Registry<R>>,
}

impl<R> Default for Registries<R> {
    fn default() -> Self {
        Self {
            registries: BTreeMap::new(),
        }
    }
}

impl<R: Send + Sync + 'static> Registries<R> {
    /// No registries
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registry, replacing any registry for the same namespace
    pub fn insert(&mut self, registry: Registry<R>) {
        self.registries
            .insert(registry.namespace().to_string(), registry);
    }

    /// Return the model for `(namespace, variant)`, building it on first use
    pub fn get(&self, namespace: &str, variant: &str) -> Result<Arc<R>> {
        match self.registries.get(namespace) {
            Some(registry) => registry.get(variant),
            None => Err(Error::unsupported(namespace, variant)),
        }
    }

    /// Registry for `namespace`
    pub fn registry(&self, namespace: &str) -> Option<&Registry<R>> {
        self.registries.get(namespace)
    }

    /// Registered namespaces, sorted
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    /// Distinct caches behind the registries, in namespace order
    pub fn caches(&self) -> Vec<Arc<SharedCache<R>>> {
        let mut caches: Vec<Arc<SharedCache<R>>> = Vec::new();
        for registry in self.registries.values() {
            if !caches.iter().any(|c| Arc::ptr_eq(c, registry.cache())) {
                caches.push(Arc::clone(registry.cache()));
            }
        }
        caches
    }
}

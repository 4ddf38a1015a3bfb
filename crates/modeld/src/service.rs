//! Registry composition from a manifest

use std::collections::HashMap;
use std::sync::Arc;

use modelcache::{Registries, Registry, SharedCache};
use modelstore::{FileModelFactory, Manifest, ModelBundle};
use tracing::info;

/// Name of the cache shared by namespaces without a `cache` directive
pub const DEFAULT_CACHE: &str = "default";

/// Every registry the daemon serves
pub type ModelRegistries = Registries<ModelBundle>;

/// Build one registry per manifest namespace
///
/// Namespaces named by a `cache` directive share a cache of that capacity;
/// everything else shares the default cache of `default_capacity`.
///
/// # Panics
/// If `default_capacity` is 0.
pub fn build_registries(manifest: &Manifest, default_capacity: usize) -> ModelRegistries {
    let default_cache = Arc::new(SharedCache::new(DEFAULT_CACHE, default_capacity));

    let mut dedicated = HashMap::new();
    for (idx, directive) in manifest.caches.iter().enumerate() {
        let name = format!("{}-{}", directive.namespaces.join("+"), idx);
        let cache = Arc::new(SharedCache::new(name, directive.capacity));
        for ns in &directive.namespaces {
            dedicated.insert(ns.as_str(), Arc::clone(&cache));
        }
    }

    let mut registries = Registries::new();
    for ns in manifest.namespaces() {
        let cache = dedicated
            .get(ns)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&default_cache));

        let mut registry = Registry::new(ns, cache);
        for entry in manifest.entries.iter().filter(|e| e.namespace == ns) {
            registry.register(entry.variant.clone(), FileModelFactory::from_entry(entry));
        }

        info!(
            namespace = ns,
            variants = registry.variants().count(),
            cache = registry.cache().name(),
            capacity = registry.cache().capacity(),
            "registered namespace"
        );
        registries.insert(registry);
    }

    registries
}

/// Split a `namespace/variant` preload spec
pub fn parse_model_ref(spec: &str) -> Option<(&str, &str)> {
    let (namespace, variant) = spec.split_once('/')?;
    if namespace.is_empty() || variant.is_empty() {
        return None;
    }
    Some((namespace, variant))
}

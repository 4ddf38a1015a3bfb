//! Model factories
//!
//! A factory knows how to build exactly one model. Building is slow and may
//! fail; callers are expected to cache the result.

use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::artifact::{ModelArtifact, ModelBundle};
use crate::error::Result;
use crate::manifest::{ManifestEntry, PartSpec};

/// Builds one model on demand
pub trait ModelFactory: Send + Sync {
    /// What the factory produces
    type Resource: Send + Sync + 'static;

    /// Construct a fresh resource
    fn construct(&self) -> Result<Self::Resource>;
}

/// Factory backed by a closure, see [`from_fn`]
pub struct FnFactory<F> {
    f: F,
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

/// Wrap a closure as a [`ModelFactory`]
pub fn from_fn<R, F>(f: F) -> FnFactory<F>
where
    F: Fn() -> Result<R> + Send + Sync,
    R: Send + Sync + 'static,
{
    FnFactory { f }
}

impl<R, F> ModelFactory for FnFactory<F>
where
    F: Fn() -> Result<R> + Send + Sync,
    R: Send + Sync + 'static,
{
    type Resource = R;

    fn construct(&self) -> Result<R> {
        (self.f)()
    }
}

/// Builds a [`ModelBundle`] by mapping every part listed in the manifest
#[derive(Debug, Clone)]
pub struct FileModelFactory {
    parts: Vec<PartSpec>,
}

impl FileModelFactory {
    /// Factory for an explicit list of parts
    pub fn new(parts: Vec<PartSpec>) -> Self {
        Self { parts }
    }

    /// Factory for a manifest entry
    pub fn from_entry(entry: &ManifestEntry) -> Self {
        Self::new(entry.parts.clone())
    }

    /// Parts this factory loads
    pub fn parts(&self) -> &[PartSpec] {
        &self.parts
    }
}

impl ModelFactory for FileModelFactory {
    type Resource = ModelBundle;

    fn construct(&self) -> Result<ModelBundle> {
        let started = Instant::now();
        let mut bundle = ModelBundle::new();

        for spec in &self.parts {
            bundle.insert(spec.name.clone(), ModelArtifact::open(&spec.path)?);
        }

        info!(
            parts = bundle.len(),
            bytes = bundle.total_bytes(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded model bundle"
        );

        Ok(bundle)
    }
}

//! # modelstore
//!
//! The model-library side of the lazy model cache.
//!
//! ## Contents
//! - **Factories**: [`ModelFactory`] builds one model on demand
//! - **Artifacts**: memory-mapped model files grouped into a [`ModelBundle`]
//! - **Manifest**: text format listing every `(namespace, variant)` and its files

#![warn(missing_docs)]

mod artifact;
mod error;
mod factory;
pub mod format;
mod manifest;

pub use artifact::{ModelArtifact, ModelBundle, DEFAULT_PART};
pub use error::{Error, Result};
pub use factory::{from_fn, FileModelFactory, FnFactory, ModelFactory};
pub use manifest::{CacheDirective, Manifest, ManifestEntry, PartSpec};

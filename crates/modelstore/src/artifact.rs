//! Memory-mapped model artifacts
//!
//! A model is made of one or more named parts, each backed by an artifact
//! file. The mapping is read-only and lives as long as the artifact.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::format::{parse_header, ArtifactHeader, HEADER_LEN};

/// Part name used when a manifest entry lists a bare path
pub const DEFAULT_PART: &str = "default";

/// A single loaded artifact file
#[derive(Debug)]
pub struct ModelArtifact {
    path: PathBuf,
    header: ArtifactHeader,
    map: Mmap,
}

impl ModelArtifact {
    /// Map and validate the artifact at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;

        // SAFETY: the map is read-only; artifacts are not rewritten while served.
        let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(path, e))?;

        let header = parse_header(&map).map_err(|msg| Error::invalid_artifact(path, msg))?;
        let actual = (map.len() - HEADER_LEN) as u64;
        if actual != header.payload_len {
            return Err(Error::invalid_artifact(
                path,
                format!(
                    "payload length mismatch: header says {}, file has {}",
                    header.payload_len, actual
                ),
            ));
        }

        debug!(path = %path.display(), bytes = actual, "mapped model artifact");

        Ok(Self {
            path: path.to_path_buf(),
            header,
            map,
        })
    }

    /// Source file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded header
    pub fn header(&self) -> ArtifactHeader {
        self.header
    }

    /// Payload bytes (header stripped)
    pub fn payload(&self) -> &[u8] {
        &self.map[HEADER_LEN..]
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.map.len() - HEADER_LEN
    }

    /// True if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A constructed model: one or more named artifacts
///
/// Most models have a single `default` part. Namespaces that serve several
/// corpora per variant (sentiment, for instance) get one part per corpus.
#[derive(Debug, Default)]
pub struct ModelBundle {
    parts: BTreeMap<String, ModelArtifact>,
}

impl ModelBundle {
    /// Empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a part, replacing any part with the same name
    pub fn insert(&mut self, name: impl Into<String>, artifact: ModelArtifact) {
        self.parts.insert(name.into(), artifact);
    }

    /// Look up a part by name
    pub fn part(&self, name: &str) -> Option<&ModelArtifact> {
        self.parts.get(name)
    }

    /// Parts in name order
    pub fn parts(&self) -> impl Iterator<Item = (&str, &ModelArtifact)> {
        self.parts.iter().map(|(name, artifact)| (name.as_str(), artifact))
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True if the bundle has no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Sum of payload sizes across parts
    pub fn total_bytes(&self) -> usize {
        self.parts.values().map(ModelArtifact::len).sum()
    }
}

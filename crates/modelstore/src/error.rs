//! Error types for modelstore

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for modelstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading manifests or constructing models
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on a manifest or artifact file
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Malformed or inconsistent manifest
    #[error("manifest line {line}: {message}")]
    Manifest {
        /// 1-based line number (0 for whole-file checks)
        line: usize,
        /// What was wrong
        message: String,
    },

    /// Artifact file exists but is not a loadable model
    #[error("invalid model artifact {}: {message}", .path.display())]
    InvalidArtifact {
        /// Offending file
        path: PathBuf,
        /// What was wrong
        message: String,
    },

    /// A factory could not produce its resource
    #[error("construction failed: {0}")]
    Construction(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn manifest(line: usize, message: impl Into<String>) -> Self {
        Error::Manifest {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_artifact(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::InvalidArtifact {
            path: path.into(),
            message: message.into(),
        }
    }
}

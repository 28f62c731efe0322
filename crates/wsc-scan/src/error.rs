//! Error types for the scan crate.

use std::io;
use std::path::PathBuf;

/// Errors raised while walking workspace roots.
///
/// Only [`ScanError::NoRoots`] and [`ScanError::NoReadableRoots`] abort a
/// run; everything else is recorded as an issue and scanning continues.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The root list was empty.
    #[error("no workspace roots supplied")]
    NoRoots,

    /// Not a single supplied root is a readable directory.
    #[error("none of the {count} supplied workspace roots is a readable directory")]
    NoReadableRoots { count: usize },

    /// A directory or file could not be read.
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed below a category directory.
    #[error("cannot walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

/// Errors raised while reading or writing a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest exists but could not be read.
    #[error("cannot read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest is not valid JSON.
    #[error("malformed manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The manifest is valid JSON but not an object.
    #[error("manifest {path} is not a JSON object")]
    NotAnObject { path: PathBuf },

    /// The manifest could not be written back.
    #[error("cannot write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ManifestError {
    /// Returns `true` for content problems (as opposed to I/O failures).
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::NotAnObject { .. })
    }
}

/// Convenience alias for scan results.
pub type ScanResult<T> = Result<T, ScanError>;

/// Convenience alias for manifest results.
pub type ManifestResult<T> = Result<T, ManifestError>;

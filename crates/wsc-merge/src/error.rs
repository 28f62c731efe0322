//! Error types for the merge crate.

use std::io;
use std::path::PathBuf;

use wsc_scan::ManifestError;

/// Errors raised while creating or verifying a backup.
///
/// Any of these fails the entity being processed; nothing has been mutated
/// at that point.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The backup directory could not be created.
    #[error("cannot create backup directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copying the source tree failed.
    #[error("cannot copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Hashing a tree for verification failed.
    #[error("cannot hash {path}: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The copy does not match its original.
    #[error("backup {backup} does not match {original}: {detail}")]
    Mismatch {
        original: PathBuf,
        backup: PathBuf,
        detail: String,
    },
}

/// Errors raised while merging into, marking, or archiving around a target.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// The target location is occupied by something that is not an
    /// instance of the entity.
    #[error("target {target} exists but is not an instance of {name}")]
    TargetConflict { name: String, target: PathBuf },

    /// The primary could not be staged next to the target.
    #[error("cannot stage {from} into {to}: {source}")]
    Stage {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming a directory into or out of the target location failed.
    #[error("cannot move {from} to {to}: {source}")]
    Swap {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single file could not be copied during the additive merge.
    #[error("cannot copy {from} to {to}: {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Traversal of a merge candidate failed.
    #[error("cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A manifest could not be read, parsed, or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A superseded instance could not be moved to the archive.
    #[error("cannot archive {path}: {source}")]
    Supersede {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Convenience alias for backup results.
pub type BackupResult<T> = Result<T, BackupError>;

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;

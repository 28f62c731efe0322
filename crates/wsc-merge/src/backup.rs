//! Verified, timestamped pre-mutation copies.
//!
//! Layout under the archive root:
//!
//! ```text
//! <archive root>/<stamp>/<logical name>/<n>-<root label>/...   backups
//! <archive root>/superseded/<stamp>/<logical name>/...         moved copies
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use wsc_types::BackupRecord;

use crate::config::SUPERSEDED_DIR;
use crate::error::{BackupError, BackupResult};
use crate::tree;

/// Directory-name form of a run timestamp, e.g. `20250101T120000.123Z`.
pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// Creates and verifies backups for one run.
#[derive(Clone, Debug)]
pub struct BackupStore {
    archive_root: PathBuf,
    stamp: String,
    cache_dirs: Vec<String>,
}

impl BackupStore {
    /// `cache_dirs` names dependency-cache directories left out of every
    /// copy.
    pub fn new(archive_root: impl Into<PathBuf>, stamp: impl Into<String>, cache_dirs: Vec<String>) -> Self {
        Self {
            archive_root: archive_root.into(),
            stamp: stamp.into(),
            cache_dirs,
        }
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    fn is_cache(&self, name: &str) -> bool {
        self.cache_dirs.iter().any(|d| d == name)
    }

    /// Where this run's backups of one entity go.
    pub fn entity_dir(&self, logical_name: &str) -> PathBuf {
        self.archive_root
            .join(&self.stamp)
            .join(tree::path_component(logical_name))
    }

    /// Where this run's superseded copies of one entity go.
    pub fn superseded_dir(&self, logical_name: &str) -> PathBuf {
        self.archive_root
            .join(SUPERSEDED_DIR)
            .join(&self.stamp)
            .join(tree::path_component(logical_name))
    }

    /// Copy `original` into the archive and verify the copy file by file.
    ///
    /// `index` numbers the copy within the entity so two instances from
    /// roots with the same label never collide.
    pub fn back_up(
        &self,
        logical_name: &str,
        index: usize,
        original: &Path,
        root_label: &str,
    ) -> BackupResult<BackupRecord> {
        let dest = tree::unique_path(
            self.entity_dir(logical_name)
                .join(format!("{index}-{}", tree::path_component(root_label))),
        );
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| BackupError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let skip = |name: &str| self.is_cache(name);
        let stats = tree::copy_tree(original, &dest, &skip).map_err(|source| BackupError::Copy {
            from: original.to_path_buf(),
            to: dest.clone(),
            source,
        })?;

        let digest = self.verify(original, &dest)?;
        debug!(
            name = logical_name,
            from = %original.display(),
            to = %dest.display(),
            files = stats.files,
            digest = %digest.short_hex(),
            "backup verified"
        );

        Ok(BackupRecord {
            logical_name: logical_name.to_string(),
            original_path: original.to_path_buf(),
            archive_path: dest,
            created_at: Utc::now(),
            files: stats.files,
            bytes: stats.bytes,
            digest,
            verified: true,
        })
    }

    /// Compare every file of `backup` against `original` by BLAKE3 digest.
    ///
    /// Returns the tree digest when both sides hold exactly the same files.
    pub fn verify(&self, original: &Path, backup: &Path) -> BackupResult<wsc_types::ContentDigest> {
        let skip = |name: &str| self.is_cache(name);
        let hash = |path: &Path| {
            tree::tree_digest(path, &skip).map_err(|source| BackupError::Digest {
                path: path.to_path_buf(),
                source,
            })
        };
        let (want, want_files) = hash(original)?;
        let (got, got_files) = hash(backup)?;
        if want == got {
            return Ok(got);
        }

        let detail = want_files
            .iter()
            .find(|(rel, d)| got_files.get(*rel) != Some(*d))
            .map(|(rel, _)| format!("{} differs or is missing", rel.display()))
            .or_else(|| {
                got_files
                    .keys()
                    .find(|rel| !want_files.contains_key(*rel))
                    .map(|rel| format!("unexpected file {}", rel.display()))
            })
            .unwrap_or_else(|| "tree digests differ".to_string());
        warn!(original = %original.display(), backup = %backup.display(), %detail, "backup mismatch");
        Err(BackupError::Mismatch {
            original: original.to_path_buf(),
            backup: backup.to_path_buf(),
            detail,
        })
    }
}

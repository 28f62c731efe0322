//! Additive file merge and dependency union.
//!
//! Both operations only ever add to the target: a file is written when the
//! target lacks it or holds an older copy, and a dependency is added when
//! the target does not declare it in any section.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use wsc_scan::Manifest;
use wsc_types::{DependencyAddition, DependencySection};

use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::tree;

/// What one additive copy pass did.
#[derive(Debug, Default)]
pub struct AdditiveReport {
    /// Target-relative paths that were written.
    pub copied: Vec<PathBuf>,
    /// Per-file failures; none of them stopped the pass.
    pub errors: Vec<MergeError>,
}

/// Returns `true` if `source` should overwrite or create `dest`.
fn should_copy(source: &Path, dest: &Path) -> io::Result<bool> {
    match fs::metadata(dest) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
        Ok(dest_meta) => {
            let src_time = fs::metadata(source)?.modified()?;
            Ok(src_time > dest_meta.modified()?)
        }
    }
}

/// Copy files from `source` into `target` where the target lacks the
/// relative path or the source file is strictly newer.
///
/// Directories and files whose name matches `skip` are left out at every
/// depth. The top-level manifest is never copied; its dependencies are
/// merged by [`union_dependencies`] instead.
pub fn additive_copy(
    source: &Path,
    target: &Path,
    manifest_file: &str,
    skip: &dyn Fn(&str) -> bool,
) -> AdditiveReport {
    let mut report = AdditiveReport::default();
    for item in tree::files(source, skip) {
        let (path, rel) = match item {
            Ok(pair) => pair,
            Err(e) => {
                report.errors.push(MergeError::Walk {
                    path: source.to_path_buf(),
                    source: e,
                });
                continue;
            }
        };
        let skipped = rel
            .file_name()
            .is_some_and(|n| skip(&n.to_string_lossy()));
        if skipped || rel == Path::new(manifest_file) {
            continue;
        }

        let dest = target.join(&rel);
        let copy = should_copy(&path, &dest).and_then(|copy| {
            if copy {
                tree::copy_file(&path, &dest).map(|_| true)
            } else {
                Ok(false)
            }
        });
        match copy {
            Ok(true) => {
                debug!(file = %rel.display(), from = %source.display(), "file merged");
                report.copied.push(rel);
            }
            Ok(false) => {}
            Err(e) => report.errors.push(MergeError::CopyFile {
                from: path,
                to: dest,
                source: e,
            }),
        }
    }
    report
}

/// Add every dependency declared by `candidate` that `target` lacks.
///
/// Entries already present in the target, in either section, are left
/// exactly as they are. New names are bucketed by
/// [`MergeConfig::section_for`].
pub fn union_dependencies(
    target: &mut Manifest,
    candidate: &Manifest,
    config: &MergeConfig,
    source: &Path,
) -> Vec<DependencyAddition> {
    let mut added = Vec::new();
    for section in [DependencySection::Runtime, DependencySection::Development] {
        for (name, constraint) in candidate.dependencies(section) {
            let bucket = config.section_for(&name);
            if target.add_dependency(bucket, &name, &constraint) {
                added.push(DependencyAddition {
                    name,
                    constraint,
                    section: bucket,
                    source: source.to_path_buf(),
                });
            }
        }
    }
    added
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wsc_types::DependencySection;

/// Directory name of the default archive root, created under the canonical
/// workspace root.
pub const DEFAULT_ARCHIVE_DIR: &str = ".consolidation-backups";

/// Sub-directory of the archive root receiving superseded working copies.
pub const SUPERSEDED_DIR: &str = "superseded";

/// Configuration for the merge executor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Where backups and superseded copies go. Defaults to
    /// `<canonical root>/.consolidation-backups`.
    pub archive_root: Option<PathBuf>,
    /// Move superseded instances into the archive (`true`) or leave them
    /// where they are (`false`).
    pub archive_superseded: bool,
    /// A dependency whose name contains one of these goes to
    /// `devDependencies`.
    pub dev_dependency_substrings: Vec<String>,
    /// A dependency whose name starts with one of these goes to
    /// `devDependencies`.
    pub dev_dependency_prefixes: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            archive_root: None,
            archive_superseded: true,
            dev_dependency_substrings: vec!["test".into(), "spec".into()],
            dev_dependency_prefixes: vec!["@types/".into()],
        }
    }
}

impl MergeConfig {
    /// The effective archive root for a given canonical workspace root.
    pub fn archive_root_for(&self, canonical_root: &Path) -> PathBuf {
        self.archive_root
            .clone()
            .unwrap_or_else(|| canonical_root.join(DEFAULT_ARCHIVE_DIR))
    }

    /// The manifest section a newly added dependency belongs in.
    pub fn section_for(&self, dependency: &str) -> DependencySection {
        let dev = self
            .dev_dependency_substrings
            .iter()
            .any(|s| dependency.contains(s.as_str()))
            || self
                .dev_dependency_prefixes
                .iter()
                .any(|p| dependency.starts_with(p.as_str()));
        if dev {
            DependencySection::Development
        } else {
            DependencySection::Runtime
        }
    }
}

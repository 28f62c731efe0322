//! Discovered instances and the structural signals observed on them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::marker::ConsolidationMarker;

/// Structural completeness indicators observed on one instance.
///
/// Each flag is a presence test; scoring turns them into an integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuralSignals {
    /// A readable, well-formed manifest file exists.
    pub manifest: bool,
    /// The manifest declares a non-empty `name`.
    pub name: bool,
    /// The manifest declares a non-empty `version`.
    pub version: bool,
    /// The manifest declares a non-empty `description`.
    pub description: bool,
    /// The manifest has a non-empty `scripts` map.
    pub scripts: bool,
    /// The manifest has a non-empty `dependencies` map.
    pub dependencies: bool,
    /// A README file sits next to the manifest.
    pub readme: bool,
    /// A build/type-config file (e.g. `tsconfig.json`) is present.
    pub build_config: bool,
    /// The declared license equals the project's canonical license.
    pub license_match: bool,
    /// The project-specific metadata block is present in the manifest.
    pub metadata_block: bool,
}

/// One physical occurrence of a logical entity inside a workspace root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Declared manifest name, or the directory name as a fallback.
    pub logical_name: String,
    pub category: Category,
    /// The category directory this instance was found under (e.g. `packages`).
    pub category_dir: String,
    /// Absolute or root-relative path of the instance directory.
    pub path: PathBuf,
    /// The workspace root this instance belongs to.
    pub workspace_root: PathBuf,
    /// The final path component of `path`.
    pub dir_name: String,
    pub has_manifest: bool,
    /// Declared manifest version, if any.
    pub version: Option<String>,
    pub signals: StructuralSignals,
    /// Derived structural-completeness score.
    pub quality_score: u32,
    /// Global discovery sequence number; only used as a tie-break.
    pub scan_order: usize,
    /// Consolidation marker found in the manifest, if any.
    pub marker: Option<ConsolidationMarker>,
}

impl Instance {
    /// Human-facing label of the owning root (its last path component).
    pub fn root_label(&self) -> String {
        root_label(&self.workspace_root)
    }

    /// Returns `true` if this instance lives in the given workspace root.
    pub fn is_in_root(&self, root: &Path) -> bool {
        self.workspace_root == root
    }

    /// Returns `true` if the manifest carries a marker for this logical name.
    pub fn is_consolidated(&self) -> bool {
        self.marker
            .as_ref()
            .is_some_and(|m| m.matches(&self.logical_name))
    }
}

/// Last path component of a root, falling back to the full display path.
pub fn root_label(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

/// `path` with symlinks and `..` resolved, or `path` unchanged when it
/// cannot be resolved (for example because it does not exist yet).
pub fn real_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

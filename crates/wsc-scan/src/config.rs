use serde::{Deserialize, Serialize};
use wsc_types::CategoryDir;

/// Configuration for the workspace scanner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Category directories scanned under every root, in scan order.
    pub categories: Vec<CategoryDir>,
    /// Manifest file name looked up in every candidate directory.
    pub manifest_file: String,
    /// File names that count as a README.
    pub readme_files: Vec<String>,
    /// File names that count as a build/type-config file.
    pub build_config_files: Vec<String>,
    /// License string that earns the license indicator.
    pub canonical_license: String,
    /// Top-level manifest key of the project-specific metadata block.
    pub metadata_key: String,
    /// Dependency-cache directory names, skipped while scanning and copying.
    pub dependency_cache_dirs: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            categories: CategoryDir::defaults(),
            manifest_file: "package.json".into(),
            readme_files: vec!["README.md".into(), "readme.md".into(), "README".into()],
            build_config_files: vec!["tsconfig.json".into()],
            canonical_license: "CC0-1.0".into(),
            metadata_key: "cathedral".into(),
            dependency_cache_dirs: vec![
                "node_modules".into(),
                ".pnpm-store".into(),
                ".turbo".into(),
            ],
        }
    }
}

impl ScanConfig {
    /// Returns `true` if a directory entry with this name is never a candidate.
    pub fn is_ignored(&self, name: &str) -> bool {
        name.starts_with('.') || self.is_dependency_cache(name)
    }

    /// Returns `true` if `name` is a dependency-cache directory.
    pub fn is_dependency_cache(&self, name: &str) -> bool {
        self.dependency_cache_dirs.iter().any(|d| d == name)
    }
}

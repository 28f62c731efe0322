use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wsc_merge::MergeConfig;
use wsc_resolve::ResolvePolicy;
use wsc_scan::{ScanConfig, ScanError};
use wsc_types::real_path;

use crate::error::{SdkError, SdkResult};

/// Everything one consolidation run needs.
///
/// Loaded from TOML; every section is optional and falls back to its
/// defaults:
///
/// ```toml
/// roots = ["../cathedral-real", "../cathedral-fixed"]
/// canonical_root = "../cathedral-real"
///
/// [resolve]
/// low_threshold = 0.5
/// merge_threshold = 0.8
///
/// [merge]
/// archive_superseded = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatorConfig {
    /// Workspace roots, in priority order.
    pub roots: Vec<PathBuf>,
    /// Root receiving consolidated targets. Defaults to the first root.
    pub canonical_root: Option<PathBuf>,
    /// Directory for `discovery.json` / `consolidation.json`, if any.
    pub report_dir: Option<PathBuf>,
    pub scan: ScanConfig,
    pub resolve: ResolvePolicy,
    pub merge: MergeConfig,
}

impl ConsolidatorConfig {
    /// A default configuration over the given roots.
    pub fn with_roots(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| SdkError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// The effective canonical root: the configured one, else the first root.
    pub fn canonical_root(&self) -> Option<&Path> {
        self.canonical_root
            .as_deref()
            .or_else(|| self.roots.first().map(PathBuf::as_path))
    }

    /// Reject configurations that cannot run. The canonical root may name
    /// any root under another spelling; only path resolution reads the
    /// disk.
    pub fn validate(&self) -> SdkResult<()> {
        if self.roots.is_empty() {
            return Err(ScanError::NoRoots.into());
        }
        self.resolve.validate()?;
        if let Some(canonical) = &self.canonical_root {
            let real = real_path(canonical);
            if !self.roots.iter().any(|r| r == canonical || real_path(r) == real) {
                return Err(SdkError::CanonicalNotARoot(canonical.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ConsolidatorConfig::default();
        assert!(c.roots.is_empty());
        assert!(c.canonical_root().is_none());
        assert_eq!(c.resolve, ResolvePolicy::default());
        assert!(c.merge.archive_superseded);
        assert!(matches!(c.validate(), Err(SdkError::Scan(ScanError::NoRoots))));
    }

    #[test]
    fn canonical_root_defaults_to_first_root() {
        let c = ConsolidatorConfig::with_roots(["/a", "/b"]);
        assert_eq!(c.canonical_root(), Some(Path::new("/a")));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn parses_toml_sections() {
        let c = ConsolidatorConfig::from_toml_str(
            r#"
            roots = ["/work/real", "/work/fixed"]
            canonical_root = "/work/fixed"

            [scan]
            canonical_license = "MIT"

            [resolve]
            low_threshold = 0.4

            [merge]
            archive_root = "/backups"
            archive_superseded = false
            "#,
        )
        .unwrap();
        assert_eq!(c.canonical_root(), Some(Path::new("/work/fixed")));
        assert_eq!(c.scan.canonical_license, "MIT");
        assert_eq!(c.scan.manifest_file, "package.json");
        assert_eq!(c.resolve.low_threshold, 0.4);
        assert_eq!(c.resolve.merge_threshold, 0.8);
        assert_eq!(c.merge.archive_root, Some(PathBuf::from("/backups")));
        assert!(!c.merge.archive_superseded);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_foreign_canonical_root() {
        let mut c = ConsolidatorConfig::with_roots(["/a", "/b"]);
        c.canonical_root = Some("/c".into());
        assert!(matches!(c.validate(), Err(SdkError::CanonicalNotARoot(_))));
    }

    #[test]
    fn canonical_root_may_alias_a_root() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        fs::create_dir_all(&a).unwrap();
        let mut c = ConsolidatorConfig::with_roots([a.clone()]);
        c.canonical_root = Some(a.join("..").join("a"));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let mut c = ConsolidatorConfig::with_roots(["/a"]);
        c.resolve.low_threshold = 0.9;
        assert!(matches!(c.validate(), Err(SdkError::Resolve(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            ConsolidatorConfig::from_toml_str("roots = ["),
            Err(SdkError::ConfigParse(_))
        ));
    }
}

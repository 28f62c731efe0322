//! Root × category traversal and per-candidate inspection.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use wsc_types::{CategoryDir, Instance, Issue, IssueKind, StructuralSignals};

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::manifest::Manifest;

/// Everything one scan produced.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanOutput {
    /// Scored instances in discovery order (root order, then category
    /// order, then directory name).
    pub instances: Vec<Instance>,
    /// Recovered problems; none of them stopped the scan.
    pub issues: Vec<Issue>,
    /// Roots that were readable and actually walked.
    pub roots_scanned: Vec<PathBuf>,
}

/// Walks workspace roots and turns candidate directories into instances.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceScanner {
    config: ScanConfig,
}

impl WorkspaceScanner {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan every root in order.
    ///
    /// Fails only when `roots` is empty or none of them can be read. Roots
    /// are resolved to their real location first, so a root listed twice
    /// (under any spelling or through a symlink) is walked once and every
    /// instance path is a real path.
    pub fn scan(&self, roots: &[PathBuf]) -> ScanResult<ScanOutput> {
        if roots.is_empty() {
            return Err(ScanError::NoRoots);
        }

        let mut out = ScanOutput::default();
        let mut seen = HashSet::new();
        for root in roots {
            let resolved =
                fs::canonicalize(root).and_then(|real| fs::read_dir(&real).map(|_| real));
            let real = match resolved {
                Ok(real) => real,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "workspace root unreadable");
                    out.issues
                        .push(Issue::new(IssueKind::Scan, e.to_string()).with_path(root));
                    continue;
                }
            };
            if !seen.insert(real.clone()) {
                debug!(root = %root.display(), real = %real.display(), "skipping duplicate root");
                continue;
            }
            out.roots_scanned.push(real);
        }
        if out.roots_scanned.is_empty() {
            return Err(ScanError::NoReadableRoots { count: roots.len() });
        }

        let roots = out.roots_scanned.clone();
        for root in &roots {
            for category in &self.config.categories {
                self.scan_category(root, category, &mut out);
            }
        }

        info!(
            roots = out.roots_scanned.len(),
            instances = out.instances.len(),
            issues = out.issues.len(),
            "scan complete"
        );
        Ok(out)
    }

    fn scan_category(&self, root: &Path, category: &CategoryDir, out: &mut ScanOutput) {
        let dir = root.join(&category.dir);
        if !dir.exists() {
            debug!(dir = %dir.display(), "category directory absent");
            return;
        }

        let walker = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(dir.as_path()).to_path_buf();
                    let err = ScanError::Walk {
                        path: path.clone(),
                        message: e.to_string(),
                    };
                    warn!(error = %err, "category walk failed");
                    out.issues
                        .push(Issue::new(IssueKind::Scan, err.to_string()).with_path(path));
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy();
            if self.config.is_ignored(&name) || !entry.path().is_dir() {
                continue;
            }

            let order = out.instances.len();
            if let Some(instance) =
                self.inspect(root, category, entry.path(), order, &mut out.issues)
            {
                out.instances.push(instance);
            }
        }
    }

    /// Inspect one candidate directory.
    ///
    /// Returns `None` (and records an issue) if the directory or its
    /// manifest cannot be read at all. A malformed manifest still yields an
    /// instance, identified by its directory name.
    pub fn inspect(
        &self,
        root: &Path,
        category: &CategoryDir,
        dir: &Path,
        scan_order: usize,
        issues: &mut Vec<Issue>,
    ) -> Option<Instance> {
        let dir_name = dir.file_name()?.to_string_lossy().into_owned();

        if let Err(source) = fs::read_dir(dir) {
            let err = ScanError::Unreadable {
                path: dir.to_path_buf(),
                source,
            };
            warn!(error = %err, "candidate unreadable");
            issues.push(
                Issue::new(IssueKind::Scan, err.to_string())
                    .with_entity(&dir_name)
                    .with_path(dir),
            );
            return None;
        }

        let manifest_path = dir.join(&self.config.manifest_file);
        let manifest = match Manifest::read(&manifest_path) {
            Ok(m) => m,
            Err(e) if e.is_malformed() => {
                warn!(path = %manifest_path.display(), error = %e, "malformed manifest");
                issues.push(
                    Issue::new(IssueKind::ManifestParse, e.to_string())
                        .with_entity(&dir_name)
                        .with_path(&manifest_path),
                );
                None
            }
            Err(e) => {
                warn!(path = %manifest_path.display(), error = %e, "manifest unreadable");
                issues.push(
                    Issue::new(IssueKind::Scan, e.to_string())
                        .with_entity(&dir_name)
                        .with_path(&manifest_path),
                );
                return None;
            }
        };

        let signals = self.signals(dir, manifest.as_ref());
        let logical_name = manifest
            .as_ref()
            .and_then(Manifest::name)
            .map(str::to_string)
            .unwrap_or_else(|| dir_name.clone());
        let quality_score = wsc_score::score(&signals);

        debug!(
            name = %logical_name,
            path = %dir.display(),
            score = quality_score,
            "instance discovered"
        );

        Some(Instance {
            logical_name,
            category: category.category,
            category_dir: category.dir.clone(),
            path: dir.to_path_buf(),
            workspace_root: root.to_path_buf(),
            dir_name,
            has_manifest: manifest.is_some(),
            version: manifest
                .as_ref()
                .and_then(Manifest::version)
                .map(str::to_string),
            signals,
            quality_score,
            scan_order,
            marker: manifest.as_ref().and_then(Manifest::marker),
        })
    }

    fn signals(&self, dir: &Path, manifest: Option<&Manifest>) -> StructuralSignals {
        let has_file = |names: &[String]| names.iter().any(|n| dir.join(n).is_file());
        let mut s = StructuralSignals {
            readme: has_file(&self.config.readme_files),
            build_config: has_file(&self.config.build_config_files),
            ..StructuralSignals::default()
        };
        if let Some(m) = manifest {
            s.manifest = true;
            s.name = m.name().is_some();
            s.version = m.version().is_some();
            s.description = m.description().is_some();
            s.scripts = m.has_non_empty_map("scripts");
            s.dependencies = m.has_non_empty_map("dependencies");
            s.license_match = m.license() == Some(self.config.canonical_license.as_str());
            s.metadata_block = m.contains_key(&self.config.metadata_key);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsc_types::Category;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scanner() -> WorkspaceScanner {
        WorkspaceScanner::new(ScanConfig::default())
    }

    #[test]
    fn empty_root_list_is_fatal() {
        assert!(matches!(scanner().scan(&[]), Err(ScanError::NoRoots)));
    }

    #[test]
    fn all_roots_unreadable_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = vec![tmp.path().join("nope"), tmp.path().join("gone")];
        assert!(matches!(
            scanner().scan(&missing),
            Err(ScanError::NoReadableRoots { count: 2 })
        ));
    }

    #[test]
    fn unreadable_root_is_recorded_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good");
        write(&good.join("packages/geometry/package.json"), r#"{"name":"geometry"}"#);

        let out = scanner()
            .scan(&[tmp.path().join("missing"), good.clone()])
            .unwrap();
        assert_eq!(out.roots_scanned, vec![fs::canonicalize(&good).unwrap()]);
        assert_eq!(out.instances.len(), 1);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].kind, IssueKind::Scan);
    }

    #[test]
    fn scores_complete_and_bare_instances() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().join("cathedral-real");
        let fixed = tmp.path().join("cathedral-fixed");
        write(
            &real.join("packages/sacred-geometry-core/package.json"),
            r#"{
                "name": "sacred-geometry-core",
                "version": "1.0.0",
                "description": "Geometry primitives",
                "scripts": { "build": "tsc" }
            }"#,
        );
        write(&real.join("packages/sacred-geometry-core/README.md"), "# core\n");
        write(
            &fixed.join("packages/sacred-geometry-core/package.json"),
            r#"{ "name": "sacred-geometry-core", "version": "1.0.0" }"#,
        );

        let out = scanner().scan(&[real.clone(), fixed.clone()]).unwrap();
        assert!(out.issues.is_empty());
        assert_eq!(out.instances.len(), 2);

        let a = &out.instances[0];
        assert_eq!(a.logical_name, "sacred-geometry-core");
        assert_eq!(a.workspace_root, fs::canonicalize(&real).unwrap());
        assert_eq!(a.category, Category::Package);
        assert_eq!(a.quality_score, 42);
        assert_eq!(a.scan_order, 0);

        let b = &out.instances[1];
        assert_eq!(b.workspace_root, fs::canonicalize(&fixed).unwrap());
        assert_eq!(b.quality_score, 18);
        assert_eq!(b.scan_order, 1);
    }

    #[test]
    fn malformed_manifest_falls_back_to_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(&root.join("tools/linter/package.json"), "{ not json");
        write(&root.join("tools/linter/README.md"), "lint");

        let out = scanner().scan(&[root]).unwrap();
        assert_eq!(out.instances.len(), 1);
        let inst = &out.instances[0];
        assert_eq!(inst.logical_name, "linter");
        assert!(!inst.has_manifest);
        assert_eq!(inst.quality_score, wsc_score::WEIGHT_README);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].kind, IssueKind::ManifestParse);
        assert_eq!(out.issues[0].entity.as_deref(), Some("linter"));
    }

    #[test]
    fn non_utf8_manifest_falls_back_to_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        fs::create_dir_all(root.join("packages/glyphs")).unwrap();
        fs::write(root.join("packages/glyphs/package.json"), b"{\"name\": \"\xff\xfe\"}").unwrap();

        let out = scanner().scan(&[root]).unwrap();
        assert_eq!(out.instances.len(), 1);
        assert_eq!(out.instances[0].logical_name, "glyphs");
        assert!(!out.instances[0].has_manifest);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].kind, IssueKind::ManifestParse);
    }

    #[test]
    fn hidden_cache_and_plain_files_are_not_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(&root.join("apps/.cache/package.json"), r#"{"name":"cache"}"#);
        write(&root.join("apps/node_modules/x/package.json"), r#"{"name":"x"}"#);
        write(&root.join("apps/notes.txt"), "not a dir");
        write(&root.join("apps/studio/package.json"), r#"{"name":"studio"}"#);

        let out = scanner().scan(&[root]).unwrap();
        let names: Vec<_> = out.instances.iter().map(|i| i.logical_name.as_str()).collect();
        assert_eq!(names, vec!["studio"]);
        assert_eq!(out.instances[0].category, Category::App);
    }

    #[test]
    fn declared_name_overrides_dir_name() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(
            &root.join("packages/geo/package.json"),
            r#"{"name":"@cathedral/geometry","license":"CC0-1.0","cathedral":{}}"#,
        );

        let out = scanner().scan(&[root]).unwrap();
        let inst = &out.instances[0];
        assert_eq!(inst.logical_name, "@cathedral/geometry");
        assert_eq!(inst.dir_name, "geo");
        assert!(inst.signals.license_match);
        assert!(inst.signals.metadata_block);
    }

    #[test]
    fn marker_is_read_from_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(
            &root.join("packages/geometry/package.json"),
            r#"{"name":"geometry","consolidated":true,"consolidatedAt":"2025-01-01T00:00:00.000Z"}"#,
        );

        let out = scanner().scan(&[root]).unwrap();
        assert!(out.instances[0].is_consolidated());
    }

    #[test]
    fn duplicate_roots_are_walked_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(&root.join("tools/cli/package.json"), r#"{"name":"cli"}"#);

        let out = scanner().scan(&[root.clone(), root]).unwrap();
        assert_eq!(out.roots_scanned.len(), 1);
        assert_eq!(out.instances.len(), 1);
    }

    #[test]
    fn aliased_roots_are_walked_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(&root.join("packages/geometry/package.json"), r#"{"name":"geometry"}"#);
        let dotted = root.join("..").join("ws");

        let out = scanner().scan(&[root.clone(), dotted]).unwrap();
        let real = fs::canonicalize(&root).unwrap();
        assert_eq!(out.roots_scanned, vec![real.clone()]);
        assert_eq!(out.instances.len(), 1);
        assert_eq!(out.instances[0].path, real.join("packages/geometry"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_root_resolves_to_its_target() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        write(&root.join("tools/cli/package.json"), r#"{"name":"cli"}"#);
        let link = tmp.path().join("ws-link");
        std::os::unix::fs::symlink(&root, &link).unwrap();

        let out = scanner().scan(&[link, root.clone()]).unwrap();
        assert_eq!(out.roots_scanned, vec![fs::canonicalize(&root).unwrap()]);
        assert_eq!(out.instances.len(), 1);
    }
}

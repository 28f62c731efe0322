use std::path::{Path, PathBuf};

use tracing::info;
use wsc_catalog::Catalog;
use wsc_merge::MergeExecutor;
use wsc_resolve::Resolver;
use wsc_scan::WorkspaceScanner;
use wsc_types::{real_path, ConsolidationRecord, DiscoveryRecord};

use crate::config::ConsolidatorConfig;
use crate::error::{SdkError, SdkResult};
use crate::report::RunReport;

/// Result of the discovery phase.
#[derive(Clone, Debug)]
pub struct Discovery {
    pub catalog: Catalog,
    pub record: DiscoveryRecord,
}

/// High-level consolidation pipeline: scan → catalog → resolve → merge.
#[derive(Clone, Debug)]
pub struct Consolidator {
    config: ConsolidatorConfig,
    canonical_root: PathBuf,
    scanner: WorkspaceScanner,
    resolver: Resolver,
}

impl Consolidator {
    /// Validate `config` and build the pipeline. Nothing touches the disk.
    pub fn new(config: ConsolidatorConfig) -> SdkResult<Self> {
        config.validate()?;
        let canonical_root = config
            .canonical_root()
            .map(real_path)
            .ok_or(SdkError::Scan(wsc_scan::ScanError::NoRoots))?;
        let resolver = Resolver::new(config.resolve, canonical_root.clone())?;
        let scanner = WorkspaceScanner::new(config.scan.clone());
        Ok(Self {
            config,
            canonical_root,
            scanner,
            resolver,
        })
    }

    pub fn config(&self) -> &ConsolidatorConfig {
        &self.config
    }

    pub fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    // ---- Pipeline ----

    /// Scan every root and group instances by logical name.
    pub fn discover(&self) -> SdkResult<Discovery> {
        let scan = self.scanner.scan(&self.config.roots)?;
        let catalog = Catalog::from_instances(scan.instances);
        let categories = self
            .config
            .scan
            .categories
            .iter()
            .map(|c| c.dir.clone())
            .collect();
        let record = catalog.to_discovery_record(scan.roots_scanned, categories, scan.issues);
        info!(
            entities = catalog.len(),
            instances = record.instance_count(),
            needs_resolution = record.needs_resolution.len(),
            version_mismatches = record.version_mismatches.len(),
            "discovery complete"
        );
        Ok(Discovery { catalog, record })
    }

    /// Discover and resolve without touching the filesystem.
    pub fn plan(&self) -> SdkResult<RunReport> {
        self.execute(true)
    }

    /// Run the full pipeline, merging every decision.
    pub fn run(&self) -> SdkResult<RunReport> {
        self.execute(false)
    }

    fn execute(&self, dry_run: bool) -> SdkResult<RunReport> {
        let Discovery { catalog, record: discovery } = self.discover()?;
        let mut consolidation = ConsolidationRecord::new(dry_run);
        consolidation.decisions = self.resolver.resolve_all(&catalog);

        if !dry_run {
            let executor = MergeExecutor::new(
                self.config.merge.clone(),
                self.config.scan.clone(),
                self.canonical_root.clone(),
            );
            let decisions = consolidation.decisions.clone();
            executor.execute_all(&decisions, &mut consolidation);
        }
        consolidation.finish();

        info!(
            run_id = %consolidation.run_id,
            dry_run,
            decisions = consolidation.decisions.len(),
            errors = consolidation.errors.len(),
            "run complete"
        );
        Ok(RunReport {
            discovery,
            consolidation,
        })
    }

    // ---- Reports ----

    /// Persist a report into the configured report directory, if any.
    pub fn write_reports(&self, report: &RunReport) -> SdkResult<Vec<PathBuf>> {
        match &self.config.report_dir {
            Some(dir) => report.write_to(dir),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use super::*;
    use wsc_types::{MergeState, SupersededDisposition};

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Relative path → content for every file below `root`.
    fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut out = BTreeMap::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let rel = path.strip_prefix(root).unwrap().to_path_buf();
                    out.insert(rel, fs::read(&path).unwrap());
                }
            }
        }
        out
    }

    /// Two roots holding `sacred-geometry-core` (42 vs 18) plus a singleton.
    fn cathedral(tmp: &Path) -> (PathBuf, PathBuf) {
        let real = tmp.join("cathedral-real");
        let fixed = tmp.join("cathedral-fixed");
        write(
            &real.join("packages/sacred-geometry-core/package.json"),
            r#"{
  "name": "sacred-geometry-core",
  "version": "1.0.0",
  "description": "Sacred geometry primitives",
  "scripts": { "build": "tsc" }
}"#,
        );
        write(&real.join("packages/sacred-geometry-core/README.md"), "# Sacred geometry\n");
        write(&real.join("packages/sacred-geometry-core/src/index.js"), "export {};\n");
        write(
            &fixed.join("packages/sacred-geometry-core/package.json"),
            r#"{ "name": "sacred-geometry-core", "version": "1.0.1" }"#,
        );
        write(&fixed.join("packages/sacred-geometry-core/patch.js"), "// fixed\n");
        write(&fixed.join("apps/studio/package.json"), r#"{ "name": "studio" }"#);
        (real, fixed)
    }

    #[test]
    fn rejects_invalid_config_before_scanning() {
        let mut config = ConsolidatorConfig::with_roots(["/does/not/matter"]);
        config.resolve.merge_threshold = 0.1;
        assert!(matches!(Consolidator::new(config), Err(SdkError::Resolve(_))));
    }

    #[test]
    fn unreadable_roots_are_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let c = Consolidator::new(ConsolidatorConfig::with_roots([tmp.path().join("missing")])).unwrap();
        assert!(matches!(
            c.run(),
            Err(SdkError::Scan(wsc_scan::ScanError::NoReadableRoots { .. }))
        ));
    }

    #[test]
    fn discovery_reports_scores_and_mismatches() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, fixed) = cathedral(tmp.path());
        let c = Consolidator::new(ConsolidatorConfig::with_roots([real, fixed])).unwrap();
        let d = c.discover().unwrap();

        assert_eq!(d.record.instance_count(), 3);
        assert_eq!(d.record.singletons, 1);
        assert_eq!(d.record.needs_resolution, vec!["sacred-geometry-core"]);
        let scores: Vec<u32> = d.record.entities["sacred-geometry-core"]
            .iter()
            .map(|i| i.quality_score)
            .collect();
        assert_eq!(scores, vec![42, 18]);
        assert_eq!(d.record.version_mismatches.len(), 1);
        assert_eq!(d.record.categories, vec!["packages", "apps", "tools"]);
    }

    #[test]
    fn plan_does_not_touch_the_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, fixed) = cathedral(tmp.path());
        let before = snapshot(tmp.path());

        let c = Consolidator::new(ConsolidatorConfig::with_roots([real, fixed])).unwrap();
        let report = c.plan().unwrap();

        assert!(report.consolidation.dry_run);
        assert_eq!(report.consolidation.decisions.len(), 1);
        assert!(report.consolidation.outcomes.is_empty());
        assert!(report.consolidation.backups.is_empty());
        assert_eq!(snapshot(tmp.path()), before);
    }

    #[test]
    fn sacred_geometry_scenario_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, fixed) = cathedral(tmp.path());
        let target = real.join("packages/sacred-geometry-core");
        let primary_readme = fs::read(target.join("README.md")).unwrap();

        let c = Consolidator::new(ConsolidatorConfig::with_roots([real.clone(), fixed.clone()])).unwrap();
        let report = c.run().unwrap();
        let run = &report.consolidation;

        assert!(run.errors.is_empty(), "errors: {:?}", run.errors);
        let decision = &run.decisions[0];
        assert_eq!(decision.primary.workspace_root, fs::canonicalize(&real).unwrap());
        assert!(decision.merge_candidates.is_empty());
        assert_eq!(decision.archive_only.len(), 1);
        assert!(decision.reason.contains("archive-only"));

        assert_eq!(run.backups.len(), 2);
        assert!(run.backups.iter().all(|b| b.verified));

        let outcome = &run.outcomes[0];
        assert_eq!(outcome.state, MergeState::Verified);
        assert_eq!(outcome.target, fs::canonicalize(&target).unwrap());
        assert!(outcome.copied_files.is_empty());
        assert_eq!(outcome.superseded.len(), 1);
        assert!(matches!(
            outcome.superseded[0].disposition,
            SupersededDisposition::Archived { .. }
        ));

        assert_eq!(fs::read(target.join("README.md")).unwrap(), primary_readme);
        assert!(!target.join("patch.js").exists());
        assert!(!fixed.join("packages/sacred-geometry-core").exists());
        assert!(fixed.join("apps/studio/package.json").is_file());
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn aliased_roots_never_archive_the_target() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, _fixed) = cathedral(tmp.path());
        let dotted = real.join("..").join("cathedral-real");
        let target = real.join("packages/sacred-geometry-core");

        let c = Consolidator::new(ConsolidatorConfig::with_roots([real.clone(), dotted])).unwrap();
        let report = c.run().unwrap();

        assert_eq!(report.discovery.roots.len(), 1);
        assert!(report.consolidation.decisions.is_empty());
        assert!(target.join("README.md").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_canonical_root_keeps_its_target() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, fixed) = cathedral(tmp.path());
        let link = tmp.path().join("real-link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        let target = real.join("packages/sacred-geometry-core");

        let mut config = ConsolidatorConfig::with_roots([link.clone(), real.clone(), fixed]);
        config.canonical_root = Some(link);
        let c = Consolidator::new(config).unwrap();
        let report = c.run().unwrap();

        let run = &report.consolidation;
        assert_eq!(run.outcomes.len(), 1);
        assert_eq!(run.outcomes[0].state, MergeState::Verified, "errors: {:?}", run.errors);
        assert_eq!(run.outcomes[0].superseded.len(), 1);
        assert!(target.join("README.md").is_file());
        assert!(target.join("package.json").is_file());
    }

    #[test]
    fn second_run_performs_no_mutations() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, fixed) = cathedral(tmp.path());
        let c = Consolidator::new(ConsolidatorConfig::with_roots([real, fixed])).unwrap();

        let first = c.run().unwrap();
        assert_eq!(first.consolidation.consolidated().count(), 1);
        let after_first = snapshot(tmp.path());

        let second = c.run().unwrap();
        assert!(second.consolidation.decisions.is_empty());
        assert!(second.consolidation.backups.is_empty());
        assert!(second.consolidation.errors.is_empty());
        assert_eq!(snapshot(tmp.path()), after_first);
    }

    #[test]
    fn retained_instances_keep_a_marked_entity_stable() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        write(
            &a.join("tools/cli/package.json"),
            r#"{"name":"cli","version":"1.0.0","description":"d","scripts":{"x":"y"}}"#,
        );
        // 5 + 8 + 5 + 6 = 24 against 32: ratio 0.75, retained.
        write(
            &b.join("tools/cli/package.json"),
            r#"{"name":"cli","version":"0.9.0","description":"older"}"#,
        );
        let c = Consolidator::new(ConsolidatorConfig::with_roots([a, b.clone()])).unwrap();

        let first = c.run().unwrap();
        assert_eq!(first.consolidation.decisions[0].retained.len(), 1);
        assert_eq!(first.consolidation.outcomes[0].state, MergeState::Verified);
        assert!(b.join("tools/cli/package.json").is_file());
        let after_first = snapshot(tmp.path());

        let second = c.run().unwrap();
        assert_eq!(second.consolidation.skipped().count(), 1);
        assert!(second.consolidation.backups.is_empty());
        assert_eq!(snapshot(tmp.path()), after_first);
    }

    #[test]
    fn one_failing_entity_does_not_stop_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        // `broken` has a malformed manifest in the canonical root, so the
        // marker cannot be written there.
        write(&a.join("packages/broken/package.json"), "{ nope");
        write(&a.join("packages/broken/README.md"), "x");
        write(&b.join("packages/broken/README.md"), "y");
        write(&a.join("packages/fine/package.json"), r#"{"name":"fine","version":"1.0.0"}"#);
        write(&b.join("packages/fine/package.json"), r#"{"name":"fine"}"#);

        let c = Consolidator::new(ConsolidatorConfig::with_roots([a, b])).unwrap();
        let report = c.run().unwrap();
        let run = &report.consolidation;

        assert_eq!(run.outcomes.len(), 2);
        assert_eq!(run.failed().count(), 1);
        assert_eq!(run.consolidated().count(), 1);
        assert!(run.has_errors());
        assert_eq!(report.discovery.issues.len(), 1);
    }

    #[test]
    fn reports_land_in_report_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let (real, fixed) = cathedral(tmp.path());
        let mut config = ConsolidatorConfig::with_roots([real, fixed]);
        config.report_dir = Some(tmp.path().join("reports"));
        let c = Consolidator::new(config).unwrap();

        let report = c.plan().unwrap();
        let written = c.write_reports(&report).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|p| p.is_file()));
    }
}

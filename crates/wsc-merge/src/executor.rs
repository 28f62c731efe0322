use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};
use wsc_scan::{Manifest, ScanConfig};
use wsc_types::instance::{real_path, root_label};
use wsc_types::{
    ConsolidationDecision, ConsolidationMarker, ConsolidationRecord, EntityOutcome, Instance,
    Issue, IssueKind, MergeState, SupersededDisposition, SupersededRecord,
};

use crate::backup::{run_stamp, BackupStore};
use crate::config::MergeConfig;
use crate::error::{BackupResult, MergeError, MergeResult};
use crate::merge;
use crate::tree;

/// Original path → verified backup path, for one entity.
type BackupIndex = HashMap<PathBuf, PathBuf>;

// ---------------------------------------------------------------------------
// MergeExecutor
// ---------------------------------------------------------------------------

/// Runs consolidation decisions against the filesystem.
///
/// One executor corresponds to one run: every backup and superseded copy it
/// produces shares the same timestamped directory.
#[derive(Clone, Debug)]
pub struct MergeExecutor {
    config: MergeConfig,
    scan: ScanConfig,
    canonical_root: PathBuf,
    backups: BackupStore,
}

impl MergeExecutor {
    pub fn new(config: MergeConfig, scan: ScanConfig, canonical_root: impl Into<PathBuf>) -> Self {
        let canonical_root = real_path(&canonical_root.into());
        let backups = BackupStore::new(
            config.archive_root_for(&canonical_root),
            run_stamp(Utc::now()),
            scan.dependency_cache_dirs.clone(),
        );
        Self {
            config,
            scan,
            canonical_root,
            backups,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// The canonical target for a decision, and the instance already living
    /// there if any.
    ///
    /// The first instance (in scan order) inside the canonical root wins;
    /// otherwise the target is a fresh path mirroring the primary's
    /// category directory and directory name.
    pub fn target_for<'d>(&self, decision: &'d ConsolidationDecision) -> (PathBuf, Option<&'d Instance>) {
        let existing = decision
            .instances()
            .filter(|i| i.is_in_root(&self.canonical_root))
            .min_by_key(|i| i.scan_order);
        match existing {
            Some(instance) => (instance.path.clone(), Some(instance)),
            None => (
                self.canonical_root
                    .join(&decision.primary.category_dir)
                    .join(&decision.primary.dir_name),
                None,
            ),
        }
    }

    /// Execute every decision in order, appending outcomes to `record`.
    pub fn execute_all(&self, decisions: &[ConsolidationDecision], record: &mut ConsolidationRecord) {
        for decision in decisions {
            let outcome = self.execute(decision, record);
            record.outcomes.push(outcome);
        }
        info!(
            consolidated = record.consolidated().count(),
            skipped = record.skipped().count(),
            failed = record.failed().count(),
            "merge pass complete"
        );
    }

    /// Drive one decision through the state machine.
    ///
    /// Backups and issues are appended to `record`; the returned outcome is
    /// left for the caller to store.
    pub fn execute(&self, decision: &ConsolidationDecision, record: &mut ConsolidationRecord) -> EntityOutcome {
        let name = decision.logical_name.as_str();
        let (target, existing) = self.target_for(decision);
        let mut outcome = EntityOutcome::pending(name, &target);
        let manifest_path = target.join(&self.scan.manifest_file);
        info!(
            name,
            target = %target.display(),
            instances = decision.instance_count(),
            "consolidating entity"
        );

        if let Some(marker) = self.existing_marker(name, &manifest_path) {
            info!(name, at = %marker.consolidated_at, "already consolidated, skipping");
            // Observed on disk, not reached through transitions.
            outcome.state = MergeState::Verified;
            outcome.already_consolidated = true;
            outcome.marker = Some(marker);
            return outcome;
        }

        if existing.is_none() && fs::symlink_metadata(&target).is_ok() {
            let err = MergeError::TargetConflict {
                name: name.to_string(),
                target: target.clone(),
            };
            fail(&mut outcome, record, IssueKind::Target, &target, err);
            return outcome;
        }

        // Pending -> BackedUp
        let backups = match self.back_up(decision, &target, record) {
            Ok(index) => index,
            Err(e) => {
                fail(&mut outcome, record, IssueKind::Backup, &target, e);
                return outcome;
            }
        };
        if !advance(&mut outcome, MergeState::BackedUp) {
            return outcome;
        }

        // BackedUp -> Merged
        let displaced = if same_dir(&decision.primary.path, &target) {
            None
        } else {
            match self.install_primary(&decision.primary.path, &target) {
                Ok(displaced) => displaced,
                Err(e) => {
                    fail(&mut outcome, record, IssueKind::Merge, &target, e);
                    return outcome;
                }
            }
        };
        self.merge_candidates(decision, &target, displaced.as_deref(), &mut outcome, record);
        if !advance(&mut outcome, MergeState::Merged) {
            return outcome;
        }

        // Merged -> Verified
        let marker = ConsolidationMarker::new(name, Utc::now());
        if let Err(e) = write_marker(&manifest_path, &marker) {
            fail(&mut outcome, record, IssueKind::Marker, &manifest_path, e);
            return outcome;
        }
        outcome.marker = Some(marker);
        if !advance(&mut outcome, MergeState::Verified) {
            return outcome;
        }

        self.supersede(decision, &target, displaced, &backups, &mut outcome, record);

        info!(
            name,
            copied = outcome.copied_files.len(),
            dependencies = outcome.added_dependencies.len(),
            superseded = outcome.superseded.len(),
            "entity consolidated"
        );
        outcome
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn existing_marker(&self, name: &str, manifest_path: &Path) -> Option<ConsolidationMarker> {
        match Manifest::read(manifest_path) {
            Ok(manifest) => manifest
                .and_then(|m| m.marker())
                .filter(|m| m.matches(name)),
            Err(e) => {
                debug!(path = %manifest_path.display(), error = %e, "target manifest unreadable");
                None
            }
        }
    }

    /// Back up every instance plus the target, stopping at the first failure.
    fn back_up(
        &self,
        decision: &ConsolidationDecision,
        target: &Path,
        record: &mut ConsolidationRecord,
    ) -> BackupResult<BackupIndex> {
        let mut paths: Vec<(PathBuf, String)> = Vec::new();
        for instance in decision.instances() {
            if !paths.iter().any(|(p, _)| *p == instance.path) {
                paths.push((instance.path.clone(), instance.root_label()));
            }
        }
        if target.exists() && !paths.iter().any(|(p, _)| p == target) {
            paths.push((target.to_path_buf(), root_label(&self.canonical_root)));
        }

        let mut index = BackupIndex::new();
        for (n, (path, label)) in paths.iter().enumerate() {
            let backup = self
                .backups
                .back_up(&decision.logical_name, n + 1, path, label)?;
            index.insert(path.clone(), backup.archive_path.clone());
            record.backups.push(backup);
        }
        Ok(index)
    }

    /// Stage the primary next to the target and swap it in.
    ///
    /// Returns where a pre-existing target was moved to, if there was one.
    fn install_primary(&self, primary: &Path, target: &Path) -> MergeResult<Option<PathBuf>> {
        let parent = target.parent().unwrap_or(self.canonical_root.as_path());
        let dir = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = tree::unique_path(parent.join(format!(".{dir}.staging")));
        let stage_err = |source| MergeError::Stage {
            from: primary.to_path_buf(),
            to: staging.clone(),
            source,
        };

        fs::create_dir_all(parent).map_err(stage_err)?;
        let skip = |name: &str| self.scan.is_dependency_cache(name);
        if let Err(source) = tree::copy_tree(primary, &staging, &skip) {
            discard(&staging);
            return Err(stage_err(source));
        }

        let displaced = if target.exists() {
            let aside = tree::unique_path(parent.join(format!(".{dir}.displaced")));
            if let Err(source) = fs::rename(target, &aside) {
                discard(&staging);
                return Err(MergeError::Swap {
                    from: target.to_path_buf(),
                    to: aside,
                    source,
                });
            }
            Some(aside)
        } else {
            None
        };

        if let Err(source) = fs::rename(&staging, target) {
            if let Some(aside) = &displaced {
                if let Err(e) = fs::rename(aside, target) {
                    warn!(from = %aside.display(), error = %e, "could not restore displaced target");
                }
            }
            discard(&staging);
            return Err(MergeError::Swap {
                from: staging,
                to: target.to_path_buf(),
                source,
            });
        }
        debug!(from = %primary.display(), to = %target.display(), "primary installed");
        Ok(displaced)
    }

    /// Additive file merge and dependency union from every merge candidate.
    ///
    /// Failures are recorded and never stop the pass.
    fn merge_candidates(
        &self,
        decision: &ConsolidationDecision,
        target: &Path,
        displaced: Option<&Path>,
        outcome: &mut EntityOutcome,
        record: &mut ConsolidationRecord,
    ) {
        if decision.merge_candidates.is_empty() {
            return;
        }
        let name = decision.logical_name.as_str();
        let manifest_file = self.scan.manifest_file.as_str();
        let manifest_path = target.join(manifest_file);
        let skip = |n: &str| self.scan.is_ignored(n);

        let mut target_manifest = match Manifest::read(&manifest_path) {
            Ok(m) => Some(m.unwrap_or_default()),
            Err(e) => {
                note(record, IssueKind::Merge, name, &manifest_path, MergeError::from(e));
                None
            }
        };
        let before = outcome.added_dependencies.len();

        for candidate in &decision.merge_candidates {
            let source = if same_dir(&candidate.instance.path, target) {
                match displaced {
                    Some(aside) => aside,
                    None => continue,
                }
            } else {
                candidate.instance.path.as_path()
            };

            let report = merge::additive_copy(source, target, manifest_file, &skip);
            for rel in report.copied {
                if !outcome.copied_files.contains(&rel) {
                    outcome.copied_files.push(rel);
                }
            }
            for err in report.errors {
                note(record, IssueKind::Merge, name, source, err);
            }

            let Some(target_manifest) = target_manifest.as_mut() else {
                continue;
            };
            let candidate_manifest = source.join(manifest_file);
            match Manifest::read(&candidate_manifest) {
                Ok(Some(m)) => {
                    let added = merge::union_dependencies(
                        target_manifest,
                        &m,
                        &self.config,
                        &candidate.instance.path,
                    );
                    outcome.added_dependencies.extend(added);
                }
                Ok(None) => {}
                Err(e) => note(record, IssueKind::Merge, name, &candidate_manifest, MergeError::from(e)),
            }
        }

        if outcome.added_dependencies.len() > before {
            if let Some(m) = &target_manifest {
                if let Err(e) = m.write(&manifest_path) {
                    outcome.added_dependencies.truncate(before);
                    note(record, IssueKind::Merge, name, &manifest_path, MergeError::from(e));
                }
            }
        }
    }

    /// Move replaced working copies into the archive area.
    ///
    /// The primary (when it is not the target), merge candidates and
    /// archive-only instances are superseded; retained instances stay where
    /// they are. A target displaced by the primary is always archived since
    /// it no longer has a place in the workspace.
    fn supersede(
        &self,
        decision: &ConsolidationDecision,
        target: &Path,
        displaced: Option<PathBuf>,
        backups: &BackupIndex,
        outcome: &mut EntityOutcome,
        record: &mut ConsolidationRecord,
    ) {
        let name = decision.logical_name.as_str();
        let mut moves: Vec<(PathBuf, PathBuf, String, bool)> = Vec::new();
        let superseded = std::iter::once(&decision.primary).chain(
            decision
                .merge_candidates
                .iter()
                .chain(&decision.archive_only)
                .map(|r| &r.instance),
        );
        // An instance reached through another spelling of the target must
        // never be moved away.
        for instance in superseded.filter(|i| !same_dir(&i.path, target)) {
            moves.push((
                instance.path.clone(),
                instance.path.clone(),
                instance.root_label(),
                self.config.archive_superseded,
            ));
        }
        if let Some(aside) = displaced {
            moves.push((aside, target.to_path_buf(), root_label(&self.canonical_root), true));
        }

        let dir = self.backups.superseded_dir(name);
        for (n, (current, original, label, archive)) in moves.into_iter().enumerate() {
            let disposition = if archive {
                let dest = tree::unique_path(
                    dir.join(format!("{}-{}", n + 1, tree::path_component(&label))),
                );
                match tree::move_tree(&current, &dest) {
                    Ok(()) => {
                        debug!(from = %current.display(), to = %dest.display(), "superseded copy archived");
                        SupersededDisposition::Archived { archive_path: dest }
                    }
                    Err(source) => {
                        let err = MergeError::Supersede {
                            path: current.clone(),
                            source,
                        };
                        note(record, IssueKind::Supersede, name, &current, err);
                        SupersededDisposition::KeptInPlace
                    }
                }
            } else {
                SupersededDisposition::KeptInPlace
            };
            outcome.superseded.push(SupersededRecord {
                logical_name: name.to_string(),
                backup_path: backups.get(&original).cloned().unwrap_or_default(),
                original_path: original,
                disposition,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write_marker(manifest_path: &Path, marker: &ConsolidationMarker) -> MergeResult<()> {
    let mut manifest = Manifest::read(manifest_path)?.unwrap_or_default();
    manifest.apply_marker(marker);
    manifest.write(manifest_path)?;
    Ok(())
}

/// Step the outcome forward. Returns `false` if the transition was illegal
/// and the outcome is now `Failed`.
fn advance(outcome: &mut EntityOutcome, next: MergeState) -> bool {
    match outcome.state.transition(next) {
        Ok(state) => {
            debug!(name = %outcome.logical_name, state = %state, "state advanced");
            outcome.state = state;
            true
        }
        Err(e) => {
            warn!(name = %outcome.logical_name, error = %e, "illegal merge transition");
            outcome.state = MergeState::Failed;
            false
        }
    }
}

fn fail(
    outcome: &mut EntityOutcome,
    record: &mut ConsolidationRecord,
    kind: IssueKind,
    path: &Path,
    err: impl Display,
) {
    let name = outcome.logical_name.clone();
    note(record, kind, &name, path, err);
    outcome.state = MergeState::Failed;
}

fn note(record: &mut ConsolidationRecord, kind: IssueKind, name: &str, path: &Path, err: impl Display) {
    warn!(name, kind = %kind, path = %path.display(), error = %err, "consolidation issue");
    record
        .errors
        .push(Issue::new(kind, err.to_string()).with_entity(name).with_path(path));
}

/// Returns `true` if both paths name the same directory on disk.
fn same_dir(a: &Path, b: &Path) -> bool {
    a == b || real_path(a) == real_path(b)
}

/// Remove a staging directory this executor created.
fn discard(staging: &Path) {
    if staging.exists() {
        if let Err(e) = fs::remove_dir_all(staging) {
            warn!(path = %staging.display(), error = %e, "could not remove staging directory");
        }
    }
}

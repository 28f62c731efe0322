//! Structured run outputs handed to reporting layers.
//!
//! A run produces a [`DiscoveryRecord`] (what exists where) and, unless it is
//! a dry run, a [`ConsolidationRecord`] (what was decided, backed up, merged,
//! and what went wrong). Both are plain serde data.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::ConsolidationDecision;
use crate::digest::ContentDigest;
use crate::instance::Instance;
use crate::marker::ConsolidationMarker;
use crate::state::MergeState;

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// Which pipeline step a recovered error came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Unreadable root, category directory, or candidate.
    Scan,
    /// Malformed manifest; identity fell back to the directory name.
    ManifestParse,
    /// Backup could not be created or verified; the entity failed.
    Backup,
    /// A target path conflicts with another entity; the entity failed.
    Target,
    /// A single file or dependency union step failed during merge.
    Merge,
    /// The consolidation marker could not be written; the entity failed.
    Marker,
    /// A superseded working copy could not be moved to the archive.
    Supersede,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scan => "scan",
            Self::ManifestParse => "manifest_parse",
            Self::Backup => "backup",
            Self::Target => "target",
            Self::Merge => "merge",
            Self::Marker => "marker",
            Self::Supersede => "supersede",
        };
        f.write_str(s)
    }
}

/// A recovered error. Nothing is dropped silently; every one lands here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub entity: Option<String>,
    pub path: Option<PathBuf>,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity: None,
            path: None,
            message: message.into(),
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(entity) = &self.entity {
            write!(f, " {entity}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        write!(f, ": {}", self.message)
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Instances of one entity that declare more than one distinct version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMismatch {
    pub logical_name: String,
    pub versions: Vec<String>,
}

/// Everything the scanner and catalog found in one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub roots: Vec<PathBuf>,
    pub categories: Vec<String>,
    /// Logical name → scored instances, in discovery order.
    pub entities: BTreeMap<String, Vec<Instance>>,
    /// Number of entities with exactly one instance.
    pub singletons: usize,
    /// Logical names with more than one instance.
    pub needs_resolution: Vec<String>,
    pub version_mismatches: Vec<VersionMismatch>,
    pub issues: Vec<Issue>,
}

impl DiscoveryRecord {
    /// Total number of instances across all entities.
    pub fn instance_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Backups
// ---------------------------------------------------------------------------

/// A verified, byte-identical copy of one path taken before any mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub logical_name: String,
    pub original_path: PathBuf,
    pub archive_path: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Number of regular files copied.
    pub files: u64,
    /// Total bytes copied.
    pub bytes: u64,
    /// Digest over every (relative path, file digest) pair, sorted by path.
    pub digest: ContentDigest,
    /// `true` once every copied file was re-hashed and matched its original.
    pub verified: bool,
}

// ---------------------------------------------------------------------------
// Merge outcomes
// ---------------------------------------------------------------------------

/// Manifest section a dependency is declared in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencySection {
    Runtime,
    Development,
}

impl DependencySection {
    /// The manifest key holding this section.
    pub fn manifest_key(&self) -> &'static str {
        match self {
            Self::Runtime => "dependencies",
            Self::Development => "devDependencies",
        }
    }
}

/// A dependency added to the target manifest by the union step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyAddition {
    pub name: String,
    pub constraint: String,
    pub section: DependencySection,
    /// The merge candidate the entry was taken from.
    pub source: PathBuf,
}

/// What happened to a superseded working copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SupersededDisposition {
    /// Moved out of its workspace root into the archive area.
    Archived { archive_path: PathBuf },
    /// Left where it was (moving disabled, or the move failed).
    KeptInPlace,
}

/// An instance replaced by the consolidated target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupersededRecord {
    pub logical_name: String,
    pub original_path: PathBuf,
    /// Verified backup covering this instance.
    pub backup_path: PathBuf,
    pub disposition: SupersededDisposition,
}

/// Result of running one decision through the merge executor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityOutcome {
    pub logical_name: String,
    /// Canonical target location for the entity.
    pub target: PathBuf,
    /// Last state reached.
    pub state: MergeState,
    /// `true` when a marker was already present and nothing was touched.
    pub already_consolidated: bool,
    /// Target-relative paths written by the additive file merge.
    pub copied_files: Vec<PathBuf>,
    pub added_dependencies: Vec<DependencyAddition>,
    pub superseded: Vec<SupersededRecord>,
    pub marker: Option<ConsolidationMarker>,
}

impl EntityOutcome {
    pub fn pending(logical_name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            logical_name: logical_name.into(),
            target: target.into(),
            state: MergeState::Pending,
            already_consolidated: false,
            copied_files: Vec::new(),
            added_dependencies: Vec::new(),
            superseded: Vec::new(),
            marker: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.state == MergeState::Failed
    }
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// The durable output of one consolidation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationRecord {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `true` when decisions were computed but nothing was executed.
    pub dry_run: bool,
    pub decisions: Vec<ConsolidationDecision>,
    pub backups: Vec<BackupRecord>,
    pub outcomes: Vec<EntityOutcome>,
    /// Every recovered or entity-fatal error, in the order it occurred.
    pub errors: Vec<Issue>,
}

impl ConsolidationRecord {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            decisions: Vec::new(),
            backups: Vec::new(),
            outcomes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Outcomes that reached `Verified` in this run.
    pub fn consolidated(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.state == MergeState::Verified && !o.already_consolidated)
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(|o| o.already_consolidated)
    }
}

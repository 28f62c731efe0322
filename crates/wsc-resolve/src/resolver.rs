use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use wsc_catalog::Catalog;
use wsc_types::{real_path, ConsolidationDecision, Instance, RankedInstance};

use crate::error::ResolveResult;
use crate::policy::ResolvePolicy;

/// Bucket a non-primary instance falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bucket {
    Merge,
    Retain,
    Archive,
}

/// Picks a primary per entity and buckets the remaining instances.
#[derive(Clone, Debug)]
pub struct Resolver {
    policy: ResolvePolicy,
    canonical_root: PathBuf,
}

impl Resolver {
    /// Create a resolver. Fails if the policy thresholds are invalid.
    pub fn new(policy: ResolvePolicy, canonical_root: impl Into<PathBuf>) -> ResolveResult<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            canonical_root: real_path(&canonical_root.into()),
        })
    }

    pub fn policy(&self) -> &ResolvePolicy {
        &self.policy
    }

    pub fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    /// Ranking order: score descending, canonical root first, then scan order.
    fn rank(&self, a: &Instance, b: &Instance) -> Ordering {
        b.quality_score
            .cmp(&a.quality_score)
            .then_with(|| {
                b.is_in_root(&self.canonical_root)
                    .cmp(&a.is_in_root(&self.canonical_root))
            })
            .then_with(|| a.scan_order.cmp(&b.scan_order))
    }

    fn bucket(&self, ratio: f64) -> Bucket {
        if ratio < self.policy.low_threshold {
            Bucket::Archive
        } else if ratio >= self.policy.merge_threshold {
            Bucket::Merge
        } else {
            Bucket::Retain
        }
    }

    /// Resolve one entity. Returns `None` for fewer than two instances.
    pub fn resolve(&self, logical_name: &str, instances: &[Instance]) -> Option<ConsolidationDecision> {
        if instances.len() < 2 {
            return None;
        }

        let mut ranked = instances.to_vec();
        ranked.sort_by(|a, b| self.rank(a, b));
        let mut rest = ranked.into_iter();
        let primary = rest.next()?;

        let mut reason = format!(
            "primary {}:{} scored {}",
            primary.root_label(),
            primary.path.display(),
            primary.quality_score
        );

        let mut merge_candidates = Vec::new();
        let mut retained = Vec::new();
        let mut archive_only = Vec::new();
        let (low, high) = (self.policy.low_threshold, self.policy.merge_threshold);

        for (idx, instance) in rest.enumerate() {
            if idx == 0 && instance.quality_score == primary.quality_score {
                let by = if primary.is_in_root(&self.canonical_root)
                    && !instance.is_in_root(&self.canonical_root)
                {
                    "canonical root"
                } else {
                    "scan order"
                };
                let _ = write!(reason, " (tie on score broken by {by})");
            }

            let ratio = if primary.quality_score == 0 {
                1.0
            } else {
                f64::from(instance.quality_score) / f64::from(primary.quality_score)
            };
            let bucket = self.bucket(ratio);
            let verdict = match bucket {
                Bucket::Archive => format!("ratio {ratio:.2} < {low:.2}, archive-only"),
                Bucket::Merge => format!("ratio {ratio:.2} >= {high:.2}, merge"),
                Bucket::Retain => format!("ratio {ratio:.2} in [{low:.2}, {high:.2}), retained"),
            };
            let _ = write!(
                reason,
                "; {}:{} scored {} ({verdict})",
                instance.root_label(),
                instance.path.display(),
                instance.quality_score
            );

            let ranked = RankedInstance { instance, ratio };
            match bucket {
                Bucket::Merge => merge_candidates.push(ranked),
                Bucket::Retain => retained.push(ranked),
                Bucket::Archive => archive_only.push(ranked),
            }
        }

        debug!(name = logical_name, %reason, "entity resolved");

        Some(ConsolidationDecision {
            logical_name: logical_name.to_string(),
            category: primary.category,
            primary,
            merge_candidates,
            retained,
            archive_only,
            reason,
        })
    }

    /// Resolve every multi-instance entity in the catalog, sorted by name.
    pub fn resolve_all(&self, catalog: &Catalog) -> Vec<ConsolidationDecision> {
        let decisions: Vec<_> = catalog
            .needs_resolution()
            .filter_map(|(name, instances)| self.resolve(name, instances))
            .collect();
        info!(decisions = decisions.len(), "resolution complete");
        decisions
    }
}

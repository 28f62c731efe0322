//! Resolution output for one multi-instance entity.

use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::instance::Instance;

/// A non-primary instance together with its score ratio against the primary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedInstance {
    pub instance: Instance,
    /// `instance.quality_score / primary.quality_score`.
    pub ratio: f64,
}

/// How a multi-instance entity is to be consolidated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationDecision {
    pub logical_name: String,
    pub category: Category,
    /// The highest-quality instance; its contents become the target.
    pub primary: Instance,
    /// Close-enough instances whose files and dependencies may contribute.
    pub merge_candidates: Vec<RankedInstance>,
    /// Instances between the two thresholds, left in place for review.
    pub retained: Vec<RankedInstance>,
    /// Low-quality instances that are only backed up and superseded.
    pub archive_only: Vec<RankedInstance>,
    /// Audit trail naming every compared score.
    pub reason: String,
}

impl ConsolidationDecision {
    /// All instances covered by this decision, primary first.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        std::iter::once(&self.primary).chain(
            self.merge_candidates
                .iter()
                .chain(&self.retained)
                .chain(&self.archive_only)
                .map(|r| &r.instance),
        )
    }

    /// Total number of instances covered by this decision.
    pub fn instance_count(&self) -> usize {
        1 + self.merge_candidates.len() + self.retained.len() + self.archive_only.len()
    }
}

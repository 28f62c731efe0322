use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ResolveResult};

/// Default ratio below which an instance is archive-only.
pub const DEFAULT_LOW_THRESHOLD: f64 = 0.5;
/// Default ratio at or above which an instance is a merge candidate.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.8;

/// Score-ratio thresholds used to bucket non-primary instances.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolvePolicy {
    pub low_threshold: f64,
    pub merge_threshold: f64,
}

impl Default for ResolvePolicy {
    fn default() -> Self {
        Self {
            low_threshold: DEFAULT_LOW_THRESHOLD,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
        }
    }
}

impl ResolvePolicy {
    pub fn new(low_threshold: f64, merge_threshold: f64) -> ResolveResult<Self> {
        let policy = Self {
            low_threshold,
            merge_threshold,
        };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> ResolveResult<()> {
        let (low, merge) = (self.low_threshold, self.merge_threshold);
        if low.is_finite() && merge.is_finite() && 0.0 <= low && low < merge && merge <= 1.0 {
            Ok(())
        } else {
            Err(ResolveError::InvalidThresholds { low, merge })
        }
    }
}

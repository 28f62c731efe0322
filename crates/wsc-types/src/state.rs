use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Progress of one entity through the merge executor.
///
/// ```text
/// Pending -> BackedUp -> Merged -> Verified
///    \          \          \
///     +----------+----------+--> Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    Pending,
    BackedUp,
    Merged,
    Verified,
    Failed,
}

impl MergeState {
    /// Returns `true` if `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: MergeState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::BackedUp)
                | (Self::BackedUp, Self::Merged)
                | (Self::Merged, Self::Verified)
                | (Self::Pending | Self::BackedUp | Self::Merged, Self::Failed)
        )
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn transition(self, next: MergeState) -> Result<MergeState, TypeError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TypeError::InvalidTransition { from: self, to: next })
        }
    }

    /// `Verified` and `Failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::BackedUp => "BACKED_UP",
            Self::Merged => "MERGED",
            Self::Verified => "VERIFIED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

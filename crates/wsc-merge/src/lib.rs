//! Merge executor for the workspace consolidator.
//!
//! Drives one [`wsc_types::ConsolidationDecision`] at a time through the
//! merge state machine:
//!
//! ```text
//! Pending --backup--> BackedUp --merge--> Merged --marker--> Verified
//!    \                    \                  \
//!     `--------------------`------------------`--> Failed
//! ```
//!
//! Nothing is mutated before every affected path has a verified backup, and
//! superseded working copies are moved to the archive area, never deleted.
//! A failure is scoped to the entity being processed; the executor moves on
//! to the next decision.
//!
//! # Key Types
//!
//! - [`MergeExecutor`] -- Runs decisions and fills a [`wsc_types::ConsolidationRecord`]
//! - [`MergeConfig`] -- Archive location, supersede policy, dependency buckets
//! - [`BackupStore`] -- Verified, timestamped pre-mutation copies
//! - [`MergeError`] / [`BackupError`] -- Per-step failures

pub mod backup;
pub mod config;
pub mod error;
pub mod executor;
pub mod merge;
pub mod tree;

pub use backup::BackupStore;
pub use config::MergeConfig;
pub use error::{BackupError, BackupResult, MergeError, MergeResult};
pub use executor::MergeExecutor;

//! Foundation types for the workspace consolidator (WSC).
//!
//! This crate provides the data model shared by every stage of the
//! discovery → scoring → resolution → merge pipeline, plus the structured
//! records handed to reporting layers. Every other WSC crate depends on
//! `wsc-types`.
//!
//! # Key Types
//!
//! - [`Instance`]: One physical occurrence of a logical entity
//! - [`StructuralSignals`]: Completeness indicators observed on an instance
//! - [`ConsolidationDecision`]: Primary / merge / retain / archive split
//! - [`ConsolidationMarker`]: Persisted "already consolidated" flag
//! - [`MergeState`]: Per-entity merge state machine
//! - [`BackupRecord`]: Verified pre-mutation copy of an instance
//! - [`DiscoveryRecord`] / [`ConsolidationRecord`]: Run outputs

pub mod category;
pub mod decision;
pub mod digest;
pub mod error;
pub mod instance;
pub mod marker;
pub mod record;
pub mod state;

pub use category::{Category, CategoryDir};
pub use decision::{ConsolidationDecision, RankedInstance};
pub use digest::ContentDigest;
pub use error::TypeError;
pub use instance::{real_path, Instance, StructuralSignals};
pub use marker::ConsolidationMarker;
pub use record::{
    BackupRecord, ConsolidationRecord, DependencyAddition, DependencySection, DiscoveryRecord,
    EntityOutcome, Issue, IssueKind, SupersededDisposition, SupersededRecord, VersionMismatch,
};
pub use state::MergeState;

//! High-level SDK for the workspace consolidator.
//!
//! Wires the scanner, catalog, resolver and merge executor into one
//! pipeline behind [`Consolidator`]. This is the main entry point for
//! applications embedding WSC.

pub mod config;
pub mod consolidator;
pub mod error;
pub mod report;

pub use config::ConsolidatorConfig;
pub use consolidator::{Consolidator, Discovery};
pub use error::{SdkError, SdkResult};
pub use report::RunReport;

// Re-export key types
pub use wsc_merge::MergeConfig;
pub use wsc_resolve::ResolvePolicy;
pub use wsc_scan::ScanConfig;
pub use wsc_score::{Indicator, MAX_SCORE};
pub use wsc_types::{
    ConsolidationDecision, ConsolidationRecord, DiscoveryRecord, EntityOutcome, Instance, Issue,
    IssueKind, MergeState, SupersededDisposition,
};

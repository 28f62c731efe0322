//! Workspace scanner for the workspace consolidator.
//!
//! Walks every configured workspace root × category directory, treats each
//! immediate subdirectory as a candidate instance, reads its manifest, and
//! records the structural signals the scorer needs. A single unreadable
//! directory or malformed manifest never aborts the scan; it becomes an
//! [`wsc_types::Issue`] instead.
//!
//! # Key Types
//!
//! - [`WorkspaceScanner`] -- Produces scored [`wsc_types::Instance`]s
//! - [`ScanConfig`] -- Category layout and signal-detection settings
//! - [`Manifest`] -- Order-preserving view over a `package.json`-style file
//! - [`ScanOutput`] -- Instances plus recovered issues

pub mod config;
pub mod error;
pub mod manifest;
pub mod scanner;

pub use config::ScanConfig;
pub use error::{ManifestError, ManifestResult, ScanError, ScanResult};
pub use manifest::Manifest;
pub use scanner::{ScanOutput, WorkspaceScanner};

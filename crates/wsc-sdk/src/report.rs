//! Persisting run outputs as pretty JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use wsc_types::{ConsolidationRecord, DiscoveryRecord};

use crate::error::{SdkError, SdkResult};

/// File name of the persisted discovery record.
pub const DISCOVERY_REPORT: &str = "discovery.json";
/// File name of the persisted consolidation record.
pub const CONSOLIDATION_REPORT: &str = "consolidation.json";

/// Both records produced by one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub discovery: DiscoveryRecord,
    pub consolidation: ConsolidationRecord,
}

impl RunReport {
    /// Write `discovery.json` and `consolidation.json` into `dir`, creating
    /// it if needed. Returns the written paths.
    pub fn write_to(&self, dir: &Path) -> SdkResult<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| SdkError::ReportIo {
            path: dir.to_path_buf(),
            source,
        })?;
        let discovery = write_json(&dir.join(DISCOVERY_REPORT), &self.discovery)?;
        let consolidation = write_json(&dir.join(CONSOLIDATION_REPORT), &self.consolidation)?;
        info!(dir = %dir.display(), "reports written");
        Ok(vec![discovery, consolidation])
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> SdkResult<PathBuf> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text).map_err(|source| SdkError::ReportIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(path.to_path_buf())
}

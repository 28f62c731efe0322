//! The persisted "already consolidated" marker.
//!
//! The marker lives inside the target's manifest as three top-level keys:
//!
//! ```text
//! "name":           "<logical name>"
//! "consolidated":   true
//! "consolidatedAt": "<RFC 3339 UTC timestamp>"
//! ```
//!
//! Trees consolidated by earlier tooling use the same keys and stay
//! recognizable.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Manifest key holding the boolean consolidated flag.
pub const MARKER_FLAG_KEY: &str = "consolidated";
/// Manifest key holding the consolidation timestamp.
pub const MARKER_TIME_KEY: &str = "consolidatedAt";
/// Manifest key holding the declared name.
pub const MANIFEST_NAME_KEY: &str = "name";

/// Identity + timestamp recorded on a consolidated target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationMarker {
    pub logical_name: String,
    pub consolidated_at: DateTime<Utc>,
}

impl ConsolidationMarker {
    pub fn new(logical_name: impl Into<String>, consolidated_at: DateTime<Utc>) -> Self {
        Self {
            logical_name: logical_name.into(),
            consolidated_at,
        }
    }

    /// Read a marker from a parsed manifest object.
    ///
    /// Returns `None` unless the flag is `true`, the timestamp parses as
    /// RFC 3339, and a non-empty name is declared.
    pub fn from_manifest(manifest: &Map<String, Value>) -> Option<Self> {
        if manifest.get(MARKER_FLAG_KEY).and_then(Value::as_bool) != Some(true) {
            return None;
        }
        let at = manifest
            .get(MARKER_TIME_KEY)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())?
            .with_timezone(&Utc);
        let name = manifest
            .get(MANIFEST_NAME_KEY)
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())?;
        Some(Self::new(name, at))
    }

    /// Write this marker into a manifest object, keeping other keys intact.
    pub fn apply_to(&self, manifest: &mut Map<String, Value>) {
        manifest.insert(
            MANIFEST_NAME_KEY.to_string(),
            Value::String(self.logical_name.clone()),
        );
        manifest.insert(MARKER_FLAG_KEY.to_string(), Value::Bool(true));
        manifest.insert(
            MARKER_TIME_KEY.to_string(),
            Value::String(
                self.consolidated_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
    }

    /// Returns `true` if this marker records the given logical name.
    pub fn matches(&self, logical_name: &str) -> bool {
        self.logical_name == logical_name
    }
}

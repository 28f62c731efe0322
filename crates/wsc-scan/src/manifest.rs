//! Order-preserving manifest access.
//!
//! Manifests are kept as a raw JSON object so that rewriting one (dependency
//! union, marker) leaves every key the consolidator does not understand
//! untouched and in its original position.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::{Map, Value};
use wsc_types::{ConsolidationMarker, DependencySection};

use crate::error::{ManifestError, ManifestResult};

/// A parsed `package.json`-style manifest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest from disk. Returns `Ok(None)` if the file is absent.
    pub fn read(path: &Path) -> ManifestResult<Option<Self>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ManifestError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&bytes, path).map(Some)
    }

    /// Parse raw manifest bytes; `path` is only used for error context.
    /// Invalid UTF-8 is a parse error like any other malformed input.
    pub fn parse(bytes: &[u8], path: &Path) -> ManifestResult<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(ManifestError::NotAnObject {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Declared, non-empty name.
    pub fn name(&self) -> Option<&str> {
        self.non_empty_str("name")
    }

    pub fn version(&self) -> Option<&str> {
        self.non_empty_str("version")
    }

    pub fn description(&self) -> Option<&str> {
        self.non_empty_str("description")
    }

    /// Declared license, as a plain string or an object's `type` field.
    pub fn license(&self) -> Option<&str> {
        match self.fields.get("license")? {
            Value::String(s) => Some(s.trim()),
            Value::Object(obj) => obj.get("type").and_then(Value::as_str).map(str::trim),
            _ => None,
        }
    }

    /// Returns `true` if `key` holds a non-empty JSON object.
    pub fn has_non_empty_map(&self, key: &str) -> bool {
        self.fields
            .get(key)
            .and_then(Value::as_object)
            .is_some_and(|m| !m.is_empty())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// `name → constraint` pairs declared in one dependency section.
    ///
    /// Entries whose constraint is not a string are skipped.
    pub fn dependencies(&self, section: DependencySection) -> Vec<(String, String)> {
        self.fields
            .get(section.manifest_key())
            .and_then(Value::as_object)
            .map(|deps| {
                deps.iter()
                    .filter_map(|(name, c)| c.as_str().map(|c| (name.clone(), c.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns `true` if `name` is declared in any dependency section.
    pub fn declares_dependency(&self, name: &str) -> bool {
        [DependencySection::Runtime, DependencySection::Development]
            .iter()
            .any(|s| {
                self.fields
                    .get(s.manifest_key())
                    .and_then(Value::as_object)
                    .is_some_and(|deps| deps.contains_key(name))
            })
    }

    /// Add a dependency entry unless the name is already declared anywhere.
    ///
    /// Returns `true` if the manifest changed. Existing entries are never
    /// altered.
    pub fn add_dependency(&mut self, section: DependencySection, name: &str, constraint: &str) -> bool {
        if self.declares_dependency(name) {
            return false;
        }
        let entry = self
            .fields
            .entry(section.manifest_key())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            return false;
        }
        if let Value::Object(deps) = entry {
            deps.insert(name.to_string(), Value::String(constraint.to_string()));
        }
        true
    }

    /// The consolidation marker carried by this manifest, if any.
    pub fn marker(&self) -> Option<ConsolidationMarker> {
        ConsolidationMarker::from_manifest(&self.fields)
    }

    pub fn apply_marker(&mut self, marker: &ConsolidationMarker) {
        marker.apply_to(&mut self.fields);
    }

    /// Pretty JSON with a trailing newline.
    pub fn to_pretty_string(&self) -> String {
        let mut out = serde_json::to_string_pretty(&self.fields).unwrap_or_else(|_| "{}".into());
        out.push('\n');
        out
    }

    /// Atomically replace the manifest at `path`.
    ///
    /// The content is written to a temporary file in the same directory and
    /// renamed over the destination, so readers never see a torn manifest.
    pub fn write(&self, path: &Path) -> ManifestResult<()> {
        let write_err = |source: io::Error| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.to_pretty_string().as_bytes())
            .map_err(write_err)?;
        let perms = target_permissions(path, tmp.as_file()).map_err(write_err)?;
        tmp.as_file().set_permissions(perms).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// Permissions for a rewritten manifest: those of the file being replaced,
/// or the usual `0644` for a new one.
fn target_permissions(path: &Path, tmp: &fs::File) -> io::Result<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => new_file_permissions(tmp),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn new_file_permissions(_tmp: &fs::File) -> io::Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions(tmp: &fs::File) -> io::Result<fs::Permissions> {
    Ok(tmp.metadata()?.permissions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(v: Value) -> Manifest {
        Manifest::from_map(v.as_object().cloned().unwrap())
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, b"{\"name\": \"\xff\xfe\"}").unwrap();
        let err = Manifest::read(&path).unwrap_err();
        assert!(err.is_malformed(), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("package.json");
        fs::write(&existing, r#"{"name":"geometry"}"#).unwrap();
        fs::set_permissions(&existing, fs::Permissions::from_mode(0o664)).unwrap();
        let m = Manifest::read(&existing).unwrap().unwrap();
        m.write(&existing).unwrap();
        let mode = fs::metadata(&existing).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o664);

        let fresh = dir.path().join("fresh.json");
        Manifest::new().write(&fresh).unwrap();
        let mode = fs::metadata(&fresh).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Manifest::read(&dir.path().join("package.json")).unwrap().is_none());
    }

    #[test]
    fn read_malformed_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, "{ \"name\": ").unwrap();
        let err = Manifest::read(&path).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.is_malformed());
    }

    #[test]
    fn read_array_is_not_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            Manifest::read(&path),
            Err(ManifestError::NotAnObject { .. })
        ));
    }

    #[test]
    fn accessors_ignore_blank_values() {
        let m = manifest(json!({
            "name": "  ",
            "version": "1.0.0",
            "description": "",
            "license": { "type": "CC0-1.0" },
            "scripts": {},
            "dependencies": { "three": "^0.160.0", "weird": 3 }
        }));
        assert_eq!(m.name(), None);
        assert_eq!(m.version(), Some("1.0.0"));
        assert_eq!(m.description(), None);
        assert_eq!(m.license(), Some("CC0-1.0"));
        assert!(!m.has_non_empty_map("scripts"));
        assert!(m.has_non_empty_map("dependencies"));
        assert_eq!(
            m.dependencies(DependencySection::Runtime),
            vec![("three".to_string(), "^0.160.0".to_string())]
        );
    }

    #[test]
    fn add_dependency_never_alters_existing_entries() {
        let mut m = manifest(json!({
            "dependencies": { "three": "^0.160.0" },
            "devDependencies": { "vitest": "^1.0.0" }
        }));
        assert!(!m.add_dependency(DependencySection::Runtime, "three", "^0.100.0"));
        assert!(!m.add_dependency(DependencySection::Runtime, "vitest", "^2.0.0"));
        assert!(m.add_dependency(DependencySection::Runtime, "d3", "^7.0.0"));
        assert!(m.add_dependency(DependencySection::Development, "@types/d3", "^7.0.0"));

        assert_eq!(m.as_map()["dependencies"]["three"], json!("^0.160.0"));
        assert_eq!(m.as_map()["devDependencies"]["vitest"], json!("^1.0.0"));
        assert_eq!(m.as_map()["dependencies"]["d3"], json!("^7.0.0"));
        assert_eq!(m.as_map()["devDependencies"]["@types/d3"], json!("^7.0.0"));
    }

    #[test]
    fn write_preserves_key_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, r#"{"name":"z","private":true,"version":"0.1.0"}"#).unwrap();

        let mut m = Manifest::read(&path).unwrap().unwrap();
        m.add_dependency(DependencySection::Runtime, "a", "1");
        m.write(&path).unwrap();

        let back = Manifest::read(&path).unwrap().unwrap();
        let keys: Vec<&String> = back.as_map().keys().collect();
        assert_eq!(keys, vec!["name", "private", "version", "dependencies"]);
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }
}

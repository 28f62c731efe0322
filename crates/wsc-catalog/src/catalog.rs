use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;
use wsc_types::{DiscoveryRecord, Instance, Issue, VersionMismatch};

/// All discovered instances, keyed by logical name.
///
/// Names are compared exactly, so `Geometry` and `geometry` are two
/// entities. Names iterate in sorted order; instances under
/// a name keep the order the scanner found them in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    entities: BTreeMap<String, Vec<Instance>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instances(instances: impl IntoIterator<Item = Instance>) -> Self {
        let mut catalog = Self::new();
        for instance in instances {
            catalog.insert(instance);
        }
        debug!(
            entities = catalog.len(),
            instances = catalog.instance_count(),
            "catalog built"
        );
        catalog
    }

    /// Add one instance under its logical name.
    pub fn insert(&mut self, instance: Instance) {
        self.entities
            .entry(instance.logical_name.clone())
            .or_default()
            .push(instance);
    }

    /// Number of distinct logical names.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn instance_count(&self) -> usize {
        self.entities.values().map(Vec::len).sum()
    }

    pub fn get(&self, logical_name: &str) -> Option<&[Instance]> {
        self.entities.get(logical_name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Instance])> {
        self.entities
            .iter()
            .map(|(name, instances)| (name.as_str(), instances.as_slice()))
    }

    /// Entities with more than one instance, sorted by name.
    pub fn needs_resolution(&self) -> impl Iterator<Item = (&str, &[Instance])> {
        self.iter().filter(|(_, instances)| instances.len() > 1)
    }

    /// Number of entities that exist exactly once.
    pub fn singletons(&self) -> usize {
        self.entities.values().filter(|v| v.len() == 1).count()
    }

    /// Entities whose instances declare more than one distinct version.
    ///
    /// Versions are listed in first-seen order. Instances without a declared
    /// version are ignored.
    pub fn version_mismatches(&self) -> Vec<VersionMismatch> {
        self.needs_resolution()
            .filter_map(|(name, instances)| {
                let mut versions: Vec<String> = Vec::new();
                for v in instances.iter().filter_map(|i| i.version.as_ref()) {
                    if !versions.contains(v) {
                        versions.push(v.clone());
                    }
                }
                (versions.len() > 1).then(|| VersionMismatch {
                    logical_name: name.to_string(),
                    versions,
                })
            })
            .collect()
    }

    /// Snapshot this catalog as a serializable discovery record.
    pub fn to_discovery_record(
        &self,
        roots: Vec<PathBuf>,
        categories: Vec<String>,
        issues: Vec<Issue>,
    ) -> DiscoveryRecord {
        DiscoveryRecord {
            roots,
            categories,
            entities: self.entities.clone(),
            singletons: self.singletons(),
            needs_resolution: self
                .needs_resolution()
                .map(|(name, _)| name.to_string())
                .collect(),
            version_mismatches: self.version_mismatches(),
            issues,
        }
    }
}

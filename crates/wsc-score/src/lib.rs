//! Structural quality scoring for the workspace consolidator.
//!
//! The score is a pure function of an instance's [`StructuralSignals`]: each
//! [`Indicator`] that is present adds its fixed weight exactly once. Nothing
//! time- or order-dependent feeds into it, so two scans of the same tree
//! always agree.
//!
//! # Key Types
//!
//! - [`Indicator`]: a tagged completeness indicator with a fixed weight
//! - [`score`]: the sum of the weights of every indicator present

use wsc_types::StructuralSignals;

/// Weight for an existing, well-formed manifest.
pub const WEIGHT_MANIFEST: u32 = 5;
/// Weight for a declared name.
pub const WEIGHT_NAME: u32 = 8;
/// Weight for a declared version.
pub const WEIGHT_VERSION: u32 = 5;
/// Weight for a declared description.
pub const WEIGHT_DESCRIPTION: u32 = 6;
/// Weight for a non-empty script map.
pub const WEIGHT_SCRIPTS: u32 = 8;
/// Weight for a non-empty dependency map.
pub const WEIGHT_DEPENDENCIES: u32 = 6;
/// Weight for a README.
pub const WEIGHT_README: u32 = 10;
/// Weight for a build/type-config file.
pub const WEIGHT_BUILD_CONFIG: u32 = 8;
/// Weight for a license matching the canonical license string.
pub const WEIGHT_LICENSE: u32 = 5;
/// Weight for the project-specific metadata block.
pub const WEIGHT_METADATA: u32 = 8;

/// One structural completeness indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Indicator {
    Manifest,
    Name,
    Version,
    Description,
    Scripts,
    Dependencies,
    Readme,
    BuildConfig,
    License,
    Metadata,
}

impl Indicator {
    /// Every indicator, in scoring order.
    pub const ALL: [Indicator; 10] = [
        Self::Manifest,
        Self::Name,
        Self::Version,
        Self::Description,
        Self::Scripts,
        Self::Dependencies,
        Self::Readme,
        Self::BuildConfig,
        Self::License,
        Self::Metadata,
    ];

    pub const fn weight(self) -> u32 {
        match self {
            Self::Manifest => WEIGHT_MANIFEST,
            Self::Name => WEIGHT_NAME,
            Self::Version => WEIGHT_VERSION,
            Self::Description => WEIGHT_DESCRIPTION,
            Self::Scripts => WEIGHT_SCRIPTS,
            Self::Dependencies => WEIGHT_DEPENDENCIES,
            Self::Readme => WEIGHT_README,
            Self::BuildConfig => WEIGHT_BUILD_CONFIG,
            Self::License => WEIGHT_LICENSE,
            Self::Metadata => WEIGHT_METADATA,
        }
    }

    /// Returns `true` if the indicator is present in `signals`.
    pub fn is_present(self, signals: &StructuralSignals) -> bool {
        match self {
            Self::Manifest => signals.manifest,
            Self::Name => signals.name,
            Self::Version => signals.version,
            Self::Description => signals.description,
            Self::Scripts => signals.scripts,
            Self::Dependencies => signals.dependencies,
            Self::Readme => signals.readme,
            Self::BuildConfig => signals.build_config,
            Self::License => signals.license_match,
            Self::Metadata => signals.metadata_block,
        }
    }
}

/// The highest score an instance can reach.
pub const MAX_SCORE: u32 = {
    let mut total = 0;
    let mut i = 0;
    while i < Indicator::ALL.len() {
        total += Indicator::ALL[i].weight();
        i += 1;
    }
    total
};

/// Compute the quality score for a set of structural signals.
pub fn score(signals: &StructuralSignals) -> u32 {
    Indicator::ALL
        .iter()
        .filter(|i| i.is_present(signals))
        .map(|i| i.weight())
        .sum()
}

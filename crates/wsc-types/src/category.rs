use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of logical unit an instance represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Package,
    App,
    Tool,
}

impl Category {
    /// The directory name this category lives under by convention.
    pub fn default_dir(&self) -> &'static str {
        match self {
            Self::Package => "packages",
            Self::App => "apps",
            Self::Tool => "tools",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::App => "app",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category directory scanned under every workspace root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDir {
    /// Directory name relative to the workspace root (e.g. `packages`).
    pub dir: String,
    /// The category assigned to instances found in this directory.
    pub category: Category,
}

impl CategoryDir {
    pub fn new(dir: impl Into<String>, category: Category) -> Self {
        Self {
            dir: dir.into(),
            category,
        }
    }

    /// The conventional `packages`, `apps`, `tools` layout, in that order.
    pub fn defaults() -> Vec<Self> {
        [Category::Package, Category::App, Category::Tool]
            .into_iter()
            .map(|c| Self::new(c.default_dir(), c))
            .collect()
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("cannot read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("canonical root {0} is not one of the workspace roots")]
    CanonicalNotARoot(PathBuf),

    #[error("scan error: {0}")]
    Scan(#[from] wsc_scan::ScanError),

    #[error("resolve error: {0}")]
    Resolve(#[from] wsc_resolve::ResolveError),

    #[error("cannot write report {path}: {source}")]
    ReportIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode report: {0}")]
    ReportEncode(#[from] serde_json::Error),
}

pub type SdkResult<T> = Result<T, SdkError>;

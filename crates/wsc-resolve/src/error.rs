//! Error types for the resolve crate.

/// Errors raised while configuring the resolver.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Thresholds must satisfy `0 <= low < merge <= 1`.
    #[error("invalid thresholds: low {low} and merge {merge} must satisfy 0 <= low < merge <= 1")]
    InvalidThresholds { low: f64, merge: f64 },
}

/// Convenience alias for resolve results.
pub type ResolveResult<T> = Result<T, ResolveError>;

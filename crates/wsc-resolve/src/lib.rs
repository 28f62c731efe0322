//! Duplicate resolution for the workspace consolidator.
//!
//! For every entity with more than one instance the [`Resolver`] picks a
//! primary (highest score, then canonical root, then scan order) and sorts
//! the rest into merge candidates, retained instances, and archive-only
//! instances by their score ratio against the primary.
//!
//! # Key Types
//!
//! - [`ResolvePolicy`] -- The two ratio thresholds
//! - [`Resolver`] -- Turns catalog entries into [`wsc_types::ConsolidationDecision`]s
//! - [`ResolveError`] -- Invalid policy

pub mod error;
pub mod policy;
pub mod resolver;

pub use error::{ResolveError, ResolveResult};
pub use policy::ResolvePolicy;
pub use resolver::Resolver;

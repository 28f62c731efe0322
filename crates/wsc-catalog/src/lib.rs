//! Entity catalog for the workspace consolidator.
//!
//! Groups scanned instances by logical name so later stages can ask which
//! entities exist exactly once and which need resolution.
//!
//! # Key Types
//!
//! - [`Catalog`] -- Logical name → instances, in discovery order

pub mod catalog;

pub use catalog::Catalog;

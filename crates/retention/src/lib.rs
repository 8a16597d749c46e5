//! Retention decision engine for snapkeep
//!
//! This crate provides:
//! - Run-scoped retention thresholds
//! - Space gauge (normalized, logged free-space readings)
//! - Snapshot catalog (read-once chronological listing + label conventions)
//! - Intraday consolidator (same-day collapse past the intraday window)
//! - Space-driven evictor (oldest-first walk to the free-space floor)
//! - Snapshot creator (one labeled snapshot per dataset per run)
//! - Deletion throttle (bounded concurrent destroys)

pub mod catalog;
pub mod consolidate;
pub mod create;
pub mod evict;
pub mod gauge;
pub mod run;
pub mod thresholds;
pub mod throttle;

#[cfg(test)]
mod engine_mock;

// Re-exports
pub use catalog::Catalog;
pub use consolidate::Consolidator;
pub use create::Creator;
pub use evict::{EvictOutcome, Evictor};
pub use gauge::SpaceGauge;
pub use run::{run, RunConfig, RunReport};
pub use thresholds::Thresholds;
pub use throttle::Throttle;

/// Result type for retention operations
pub type Result<T> = anyhow::Result<T>;

//! Storage engine primitives for snapkeep
//!
//! This crate provides:
//! - The `Engine` trait: the five primitives the controller consumes
//!   (list datasets, list snapshots, free space, create, destroy)
//! - Value types (`Snapshot`, `RawSpace`)
//! - `ZfsEngine`: the production binding to the zfs/zpool binaries

pub mod error;
pub mod size;
pub mod zfs;

// Re-exports
pub use error::EngineError;
pub use size::{RawSpace, SpaceUnit};
pub use zfs::ZfsEngine;

use async_trait::async_trait;
use std::sync::Arc;

/// One snapshot as reported by the storage engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Owning dataset path (e.g. `tank/home`)
    pub dataset: String,
    /// Creation-timestamp label, unique per dataset
    pub label: String,
    /// Creation time in Unix seconds
    pub creation_epoch: i64,
}

impl Snapshot {
    /// Render the engine-facing `dataset@label` name
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.dataset, self.label)
    }
}

/// Storage engine primitives consumed by the retention controller
///
/// Implementations must be safe to share across concurrent tasks; every
/// method is an independent round-trip to the engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// List every dataset whose path is `root` or nested under it
    async fn list_datasets(&self, root: &str) -> Result<Vec<String>, EngineError>;

    /// List all snapshots across all pools visible to the process
    ///
    /// Order is unspecified; callers sort.
    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, EngineError>;

    /// Current free space of `pool`, as reported (magnitude + unit suffix)
    async fn available_space(&self, pool: &str) -> Result<RawSpace, EngineError>;

    /// Create `dataset@label`
    async fn create_snapshot(&self, dataset: &str, label: &str) -> Result<(), EngineError>;

    /// Destroy `dataset@label`
    ///
    /// A snapshot that is already absent is success, not an error: the
    /// catalog is a point-in-time listing and entries may be gone by the
    /// time the destroy is issued.
    async fn destroy_snapshot(&self, dataset: &str, label: &str) -> Result<(), EngineError>;
}

/// Shared handle to an engine implementation
pub type EngineRef = Arc<dyn Engine>;

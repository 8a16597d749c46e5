//! Read-once chronological snapshot catalog and label conventions

use crate::Result;
use anyhow::Context;
use chrono::NaiveDate;
use engine::{EngineRef, Snapshot};
use std::collections::BTreeMap;

/// Snapshot labels are local timestamps in this format, so labels sort
/// chronologically per dataset and carry their calendar day as a prefix
pub const LABEL_FORMAT: &str = "%Y-%m-%d_%H.%M.%S";

/// Point-in-time listing of all snapshots visible to the process, ascending
/// by creation time
///
/// A catalog is valid only for the pass that built it: entries may be
/// deleted (by this process or concurrently by others) the moment it is
/// built, so consumers must tolerate "already gone" on destroy. Each pass
/// lists afresh; catalogs are never cached or shared across passes.
pub struct Catalog {
    snapshots: Vec<Snapshot>,
}

impl Catalog {
    /// Build a catalog by listing the engine now
    ///
    /// Sorted ascending by `(creation_epoch, dataset, label)`; the lexical
    /// tie-break makes walk order deterministic within a timestamp group.
    pub async fn list(engine: &EngineRef) -> Result<Self> {
        let mut snapshots = engine
            .list_snapshots()
            .await
            .context("failed to list snapshots")?;

        snapshots.sort_by(|a, b| {
            (a.creation_epoch, &a.dataset, &a.label).cmp(&(b.creation_epoch, &b.dataset, &b.label))
        });

        Ok(Self { snapshots })
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// All snapshots, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    /// Snapshots grouped per dataset, each group oldest first
    pub fn by_dataset(&self) -> BTreeMap<&str, Vec<&Snapshot>> {
        let mut map: BTreeMap<&str, Vec<&Snapshot>> = BTreeMap::new();
        for snap in &self.snapshots {
            map.entry(snap.dataset.as_str()).or_default().push(snap);
        }
        map
    }
}

/// Calendar day carried by a label's date prefix
///
/// The day comes from the label, not from re-parsing wall-clock time, so
/// the labeling and consolidation passes can never disagree across timezone
/// shifts. Labels without a conforming prefix (snapshots made by other
/// tooling) yield `None` and are left alone.
pub fn day_of(label: &str) -> Option<NaiveDate> {
    let prefix = label.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

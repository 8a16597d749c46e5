//! Intraday consolidation: collapse same-day snapshots past the intraday
//! window to one survivor per calendar day

use crate::catalog::{day_of, Catalog};
use crate::throttle::{dispatch_destroy, join_destroys, Throttle};
use chrono::NaiveDate;
use engine::{EngineRef, Snapshot};
use std::collections::BTreeMap;
use tokio::task::JoinSet;

/// Bounds the count of high-frequency snapshots, independently of free
/// space
///
/// Operates on every dataset visible to the process, not just the run's
/// target pool. Runs before the space-driven pass so space pressure is
/// measured after these cheap wins.
pub struct Consolidator {
    engine: EngineRef,
    throttle: Throttle,
    intraday_cutoff: i64,
}

impl Consolidator {
    pub fn new(engine: EngineRef, throttle: Throttle, intraday_cutoff: i64) -> Self {
        Self {
            engine,
            throttle,
            intraday_cutoff,
        }
    }

    /// Run one consolidation pass, returning the number of completed
    /// deletions
    ///
    /// Per dataset and calendar day, the most recent snapshot always
    /// survives; every other same-day member is deleted iff it is older
    /// than the intraday cutoff. Days with a single snapshot are never
    /// touched. All dispatched deletions are joined before returning, so
    /// subsequent space readings see their effect.
    pub async fn run(&self) -> u64 {
        let catalog = match Catalog::list(&self.engine).await {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(%err, "skipping intraday consolidation: catalog unavailable");
                return 0;
            }
        };

        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;

        for (dataset, snapshots) in catalog.by_dataset() {
            for (day, members) in day_buckets(&snapshots) {
                // Catalog order is ascending, so the survivor is last
                let (survivor, extras) = match members.split_last() {
                    Some(split) => split,
                    None => continue,
                };

                let victims: Vec<&Snapshot> = extras
                    .iter()
                    .copied()
                    .filter(|snap| snap.creation_epoch < self.intraday_cutoff)
                    .collect();
                if victims.is_empty() {
                    continue;
                }

                tracing::info!(
                    dataset,
                    %day,
                    collapsing = victims.len(),
                    survivor = %survivor.label,
                    "collapsing intraday snapshots"
                );
                for victim in victims {
                    dispatch_destroy(&mut tasks, &self.engine, &self.throttle, victim).await;
                    dispatched += 1;
                }
            }
        }

        let deleted = join_destroys(&mut tasks).await;
        if dispatched > 0 {
            tracing::info!(dispatched, deleted, "intraday consolidation complete");
        }
        deleted
    }
}

/// Partition one dataset's snapshots into calendar-day buckets, preserving
/// ascending order within each bucket
///
/// Snapshots whose labels carry no date prefix belong to other tooling and
/// are excluded entirely.
fn day_buckets<'a>(snapshots: &[&'a Snapshot]) -> BTreeMap<NaiveDate, Vec<&'a Snapshot>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&Snapshot>> = BTreeMap::new();
    for &snap in snapshots {
        match day_of(&snap.label) {
            Some(day) => buckets.entry(day).or_default().push(snap),
            None => {
                tracing::debug!(snapshot = %snap.full_name(), "label has no day prefix, skipping");
            }
        }
    }
    buckets
}

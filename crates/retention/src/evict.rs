//! Space-driven eviction: delete oldest-first until the free-space floor is
//! met or the age ceiling is reached

use crate::catalog::Catalog;
use crate::gauge::SpaceGauge;
use crate::thresholds::Thresholds;
use crate::throttle::{dispatch_destroy, join_destroys, Throttle};
use engine::EngineRef;
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome of one eviction pass
#[derive(Debug, Clone, Copy)]
pub struct EvictOutcome {
    /// Completed deletions
    pub deleted: u64,
    /// Final free-space reading, if the pool was queryable
    pub free_gib: Option<u64>,
    /// Whether the free-space floor was satisfied at the end of the pass
    pub floor_met: bool,
}

/// Greedy oldest-first eviction against a live, re-polled space reading
///
/// Deletions are asynchronous relative to the engine's space accounting, so
/// the walk re-polls once per distinct timestamp group rather than once per
/// snapshot: in-flight deletions are joined, a short settle delay lets
/// reclamation accounting catch up, and only then is the gauge read again.
pub struct Evictor {
    engine: EngineRef,
    gauge: SpaceGauge,
    throttle: Throttle,
    thresholds: Thresholds,
    settle_delay: Duration,
}

impl Evictor {
    pub fn new(
        engine: EngineRef,
        gauge: SpaceGauge,
        throttle: Throttle,
        thresholds: Thresholds,
        settle_delay: Duration,
    ) -> Self {
        Self {
            engine,
            gauge,
            throttle,
            thresholds,
            settle_delay,
        }
    }

    /// Run one eviction pass
    pub async fn run(&self) -> EvictOutcome {
        let floor = self.thresholds.min_free_gib;

        // An unreadable gauge counts as "below floor": never skip needed
        // reclamation on a transient query failure.
        let mut free = self.gauge.available().await;
        match free {
            Some(avail) if avail >= floor => {
                tracing::info!(free_gib = avail, floor_gib = floor, "free space adequate");
                return EvictOutcome {
                    deleted: 0,
                    free_gib: free,
                    floor_met: true,
                };
            }
            Some(avail) => {
                tracing::info!(free_gib = avail, floor_gib = floor, "below free-space floor, evicting");
            }
            None => {
                tracing::warn!(floor_gib = floor, "free space unknown, assuming below floor");
            }
        }

        let catalog = match Catalog::list(&self.engine).await {
            Ok(catalog) => catalog,
            Err(err) => {
                tracing::warn!(%err, "skipping eviction: catalog unavailable");
                return EvictOutcome {
                    deleted: 0,
                    free_gib: free,
                    floor_met: false,
                };
            }
        };
        if catalog.is_empty() {
            tracing::info!("no snapshots exist, nothing to evict");
        }

        let mut tasks = JoinSet::new();
        let mut deleted = 0u64;
        // Last distinct timestamp the gauge was synchronized at. Owned by
        // this walk; written only at group boundaries.
        let mut checkpoint: Option<i64> = None;

        for snapshot in catalog.iter() {
            if snapshot.creation_epoch > self.thresholds.age_cutoff {
                // Everything from here on is newer still: a hard floor,
                // regardless of remaining space pressure.
                tracing::info!(
                    snapshot = %snapshot.full_name(),
                    "age ceiling reached, ending eviction walk"
                );
                break;
            }

            match checkpoint {
                Some(epoch) if epoch == snapshot.creation_epoch => {}
                Some(_) => {
                    // Crossing into a new timestamp group: settle in-flight
                    // deletions, then re-synchronize with real space.
                    deleted += join_destroys(&mut tasks).await;
                    tokio::time::sleep(self.settle_delay).await;
                    free = self.gauge.available().await;
                    checkpoint = Some(snapshot.creation_epoch);
                }
                None => {
                    // First group reuses the reading that started the pass
                    checkpoint = Some(snapshot.creation_epoch);
                }
            }

            if let Some(avail) = free {
                if avail >= floor {
                    tracing::info!(free_gib = avail, "free-space floor met, ending eviction walk");
                    break;
                }
            }

            dispatch_destroy(&mut tasks, &self.engine, &self.throttle, snapshot).await;
        }

        deleted += join_destroys(&mut tasks).await;
        tokio::time::sleep(self.settle_delay).await;

        let free_gib = self.gauge.available().await;
        let floor_met = matches!(free_gib, Some(avail) if avail >= floor);
        match free_gib {
            Some(avail) if avail >= floor => {
                tracing::info!(deleted, free_gib = avail, "eviction pass complete");
            }
            Some(avail) => {
                tracing::warn!(
                    deleted,
                    free_gib = avail,
                    floor_gib = floor,
                    "still below free-space floor after eviction"
                );
            }
            None => {
                tracing::warn!(deleted, "could not confirm free space after eviction");
            }
        }

        EvictOutcome {
            deleted,
            free_gib,
            floor_met,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_mock::MockEngine;
    use engine::Snapshot;
    use std::sync::Arc;

    const FAR_PAST_CEILING: i64 = i64::MAX;

    fn snap(dataset: &str, label: &str, epoch: i64) -> Snapshot {
        Snapshot {
            dataset: dataset.to_string(),
            label: label.to_string(),
            creation_epoch: epoch,
        }
    }

    fn evictor(mock: &Arc<MockEngine>, floor: u64, age_cutoff: i64) -> Evictor {
        let thresholds = Thresholds {
            min_free_gib: floor,
            age_cutoff,
            intraday_cutoff: 0,
        };
        Evictor::new(
            mock.clone(),
            SpaceGauge::new(mock.clone(), "tank"),
            Throttle::new(4),
            thresholds,
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_noop_when_floor_already_satisfied() {
        let mock = Arc::new(
            MockEngine::new()
                .with_free_gib(250)
                .with_snapshots(vec![snap("ds/a", "2026-01-01_00.00.00", 100)]),
        );

        let outcome = evictor(&mock, 200, FAR_PAST_CEILING).run().await;
        assert_eq!(outcome.deleted, 0);
        assert!(outcome.floor_met);
        // No catalog is built when the opening reading is adequate
        assert_eq!(mock.catalog_queries(), 0);
        assert_eq!(mock.snapshots().len(), 1);
    }

    #[tokio::test]
    async fn test_single_old_snapshot_suffices() {
        let mock = Arc::new(
            MockEngine::new()
                .with_free_gib(150)
                .with_reclaim_per_destroy(60)
                .with_snapshots(vec![
                    snap("ds/a", "L1", 100),
                    snap("ds/a", "L2", 9_999_999_999),
                ]),
        );

        let outcome = evictor(&mock, 200, FAR_PAST_CEILING).run().await;
        assert_eq!(outcome.deleted, 1);
        assert!(outcome.floor_met);
        assert_eq!(outcome.free_gib, Some(210));

        let remaining = mock.snapshots();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].label, "L2");
    }

    #[tokio::test]
    async fn test_never_deletes_newer_than_age_ceiling() {
        let ceiling = 1_000;
        let mock = Arc::new(
            MockEngine::new()
                .with_free_gib(0)
                .with_reclaim_per_destroy(10)
                .with_snapshots(vec![
                    snap("ds/a", "old-1", 500),
                    snap("ds/a", "old-2", 600),
                    snap("ds/a", "new-1", 1_500),
                    snap("ds/a", "new-2", 2_000),
                ]),
        );

        let outcome = evictor(&mock, 1_000_000, ceiling).run().await;
        assert_eq!(outcome.deleted, 2);
        assert!(!outcome.floor_met);

        let remaining = mock.snapshots();
        assert!(remaining.iter().all(|s| s.creation_epoch > ceiling));
    }

    #[tokio::test]
    async fn test_age_ceiling_blocks_all_eviction() {
        // Everything newer than the ceiling: zero deletions no matter the
        // deficit, degraded warning logged on the way out
        let mock = Arc::new(MockEngine::new().with_free_gib(5).with_snapshots(vec![
            snap("ds/a", "new-1", 5_000),
            snap("ds/b", "new-2", 6_000),
        ]));

        let outcome = evictor(&mock, 200, 1_000).run().await;
        assert_eq!(outcome.deleted, 0);
        assert!(!outcome.floor_met);
        assert_eq!(mock.snapshots().len(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_order_nondecreasing_across_groups() {
        let mock = Arc::new(
            MockEngine::new()
                .with_free_gib(0)
                .with_reclaim_per_destroy(1)
                .with_snapshots(vec![
                    snap("ds/b", "g1-b", 100),
                    snap("ds/a", "g1-a", 100),
                    snap("ds/c", "g2-c", 200),
                    snap("ds/d", "g3-d", 300),
                ]),
        );

        let outcome = evictor(&mock, 1_000_000, FAR_PAST_CEILING).run().await;
        assert_eq!(outcome.deleted, 4);

        // Group boundaries are joined before the walk advances, so recorded
        // epochs never decrease
        let epochs: Vec<i64> = mock.destroyed().iter().map(|s| s.creation_epoch).collect();
        let mut sorted = epochs.clone();
        sorted.sort_unstable();
        assert_eq!(epochs, sorted);
    }

    #[tokio::test]
    async fn test_repolls_once_per_timestamp_group() {
        let mock = Arc::new(
            MockEngine::new()
                .with_free_gib(0)
                .with_reclaim_per_destroy(1)
                .with_snapshots(vec![
                    snap("ds/a", "g1-a", 100),
                    snap("ds/b", "g1-b", 100),
                    snap("ds/c", "g2-c", 200),
                    snap("ds/d", "g2-d", 200),
                    snap("ds/e", "g3-e", 300),
                ]),
        );

        evictor(&mock, 1_000_000, FAR_PAST_CEILING).run().await;

        // Opening poll + one per group crossing (2) + final poll
        assert_eq!(mock.space_queries(), 4);
    }

    #[tokio::test]
    async fn test_stops_mid_walk_once_floor_met() {
        // Each group crossing re-polls; after the first group's deletions
        // the floor is satisfied and the walk must stop
        let mock = Arc::new(
            MockEngine::new()
                .with_free_gib(190)
                .with_reclaim_per_destroy(20)
                .with_snapshots(vec![
                    snap("ds/a", "g1-a", 100),
                    snap("ds/b", "g2-b", 200),
                    snap("ds/c", "g3-c", 300),
                ]),
        );

        let outcome = evictor(&mock, 200, FAR_PAST_CEILING).run().await;
        assert_eq!(outcome.deleted, 1);
        assert!(outcome.floor_met);
        assert_eq!(mock.snapshots().len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_gauge_is_conservative() {
        // Space never readable: evict everything at or below the ceiling
        let mock = Arc::new(
            MockEngine::new()
                .with_space_failure()
                .with_snapshots(vec![
                    snap("ds/a", "old", 100),
                    snap("ds/b", "new", 5_000),
                ]),
        );

        let outcome = evictor(&mock, 200, 1_000).run().await;
        assert_eq!(outcome.deleted, 1);
        assert!(!outcome.floor_met);
        assert_eq!(outcome.free_gib, None);
        assert_eq!(mock.snapshots().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_catalog_logs_and_proceeds() {
        let mock = Arc::new(MockEngine::new().with_free_gib(10));
        let outcome = evictor(&mock, 200, FAR_PAST_CEILING).run().await;
        assert_eq!(outcome.deleted, 0);
        assert!(!outcome.floor_met);
        assert_eq!(mock.catalog_queries(), 1);
    }
}

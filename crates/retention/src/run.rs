//! Per-run orchestration

use crate::consolidate::Consolidator;
use crate::create::{run_label, Creator};
use crate::evict::Evictor;
use crate::gauge::SpaceGauge;
use crate::thresholds::Thresholds;
use crate::throttle::Throttle;
use chrono::Local;
use engine::EngineRef;
use std::time::Duration;

/// Configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Pool to snapshot and reclaim space on
    pub pool: String,
    /// Free-space floor in GiB
    pub min_free_gib: u64,
    /// Age-retention ceiling in days
    pub age_days: i64,
    /// Intraday-retention ceiling in days
    pub intraday_days: i64,
    /// Cap on concurrently in-flight destroys
    pub max_in_flight: usize,
    /// Settle time between joining deletions and re-polling space
    pub settle_delay: Duration,
}

impl RunConfig {
    pub fn new(pool: impl Into<String>) -> Self {
        Self {
            pool: pool.into(),
            min_free_gib: 200,
            age_days: 30,
            intraday_days: 7,
            max_in_flight: 16,
            settle_delay: Duration::from_secs(2),
        }
    }
}

/// What one run did, for the operator summary
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    /// Deletions completed by the intraday consolidator
    pub consolidated: u64,
    /// Deletions completed by the space-driven evictor
    pub evicted: u64,
    /// Snapshots created
    pub created: u64,
    /// Datasets whose snapshot creation failed
    pub create_failures: u64,
    /// Final free-space reading, if the pool was queryable
    pub free_gib: Option<u64>,
    /// Whether the free-space floor held at the end of the eviction pass
    pub floor_met: bool,
}

/// Execute one full run: consolidate, evict, then snapshot the target pool
///
/// The run label and thresholds are captured once, up front. Each pass
/// joins its own dispatched work, so nothing is outstanding on return. No
/// state survives the run.
pub async fn run(engine: EngineRef, config: RunConfig) -> RunReport {
    let started = Local::now();
    let label = run_label(started);
    let thresholds = Thresholds::compute(
        started.timestamp(),
        config.min_free_gib,
        config.age_days,
        config.intraday_days,
    );
    tracing::info!(
        pool = %config.pool,
        label = %label,
        min_free_gib = thresholds.min_free_gib,
        age_days = config.age_days,
        intraday_days = config.intraday_days,
        "starting run"
    );

    let gauge = SpaceGauge::new(engine.clone(), config.pool.clone());
    let throttle = Throttle::new(config.max_in_flight);

    // Opening reading, logged: the baseline the pass sequence starts from
    gauge.available().await;

    let consolidated = Consolidator::new(engine.clone(), throttle.clone(), thresholds.intraday_cutoff)
        .run()
        .await;

    let outcome = Evictor::new(engine.clone(), gauge, throttle, thresholds, config.settle_delay)
        .run()
        .await;

    let (created, create_failures) = Creator::new(engine, config.pool.clone(), label).run().await;

    let report = RunReport {
        consolidated,
        evicted: outcome.deleted,
        created,
        create_failures,
        free_gib: outcome.free_gib,
        floor_met: outcome.floor_met,
    };
    tracing::info!(
        pool = %config.pool,
        consolidated = report.consolidated,
        evicted = report.evicted,
        created = report.created,
        create_failures = report.create_failures,
        "run complete"
    );
    report
}

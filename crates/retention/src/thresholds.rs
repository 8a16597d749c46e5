//! Run-scoped retention thresholds

const SECS_PER_DAY: i64 = 86_400;

/// Retention thresholds, computed once per run and immutable afterwards
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Free-space floor in whole GiB (default: 200)
    pub min_free_gib: u64,
    /// Absolute epoch cutoff for the age ceiling: snapshots created after
    /// this instant are never deleted, regardless of space pressure
    pub age_cutoff: i64,
    /// Absolute epoch cutoff for intraday consolidation: same-day extras
    /// created before this instant are collapsed
    pub intraday_cutoff: i64,
}

impl Thresholds {
    /// Compute thresholds from the run timestamp and the policy knobs
    ///
    /// `intraday_days < age_days` in typical use, but this is not enforced.
    pub fn compute(now_epoch: i64, min_free_gib: u64, age_days: i64, intraday_days: i64) -> Self {
        Self {
            min_free_gib,
            age_cutoff: now_epoch - age_days * SECS_PER_DAY,
            intraday_cutoff: now_epoch - intraday_days * SECS_PER_DAY,
        }
    }
}

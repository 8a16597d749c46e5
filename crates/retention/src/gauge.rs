//! Pool free-space gauge

use engine::EngineRef;

/// Normalized free-space readings for one pool
///
/// Every successful reading is logged with a timestamp; the log line is the
/// record by which the evictor re-synchronizes with real-world space after
/// issuing asynchronous deletes.
pub struct SpaceGauge {
    engine: EngineRef,
    pool: String,
}

impl SpaceGauge {
    pub fn new(engine: EngineRef, pool: impl Into<String>) -> Self {
        Self {
            engine,
            pool: pool.into(),
        }
    }

    /// Current free space in whole GiB, or `None` if the pool was
    /// unqueryable
    ///
    /// Callers must treat `None` conservatively (as "below threshold") so a
    /// momentarily busy pool never silently skips needed reclamation.
    pub async fn available(&self) -> Option<u64> {
        match self.engine.available_space(&self.pool).await {
            Ok(raw) => {
                let free_gib = raw.to_gib();
                tracing::info!(pool = %self.pool, free_gib, "pool free space");
                Some(free_gib)
            }
            Err(err) => {
                tracing::warn!(pool = %self.pool, %err, "failed to read pool free space");
                None
            }
        }
    }
}

//! Per-run snapshot creation

use chrono::{DateTime, Local};
use engine::EngineRef;
use tokio::task::JoinSet;

use crate::catalog::LABEL_FORMAT;

/// Render the shared label for one run from its start timestamp
pub fn run_label(started: DateTime<Local>) -> String {
    started.format(LABEL_FORMAT).to_string()
}

/// Creates one snapshot per dataset in the target pool, all carrying the
/// run's single label
///
/// The label is captured once at run start so every dataset of one run
/// forms one generation for downstream incremental-transfer tooling.
pub struct Creator {
    engine: EngineRef,
    pool: String,
    label: String,
}

impl Creator {
    pub fn new(engine: EngineRef, pool: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            engine,
            pool: pool.into(),
            label: label.into(),
        }
    }

    /// Run one creation pass, returning `(created, failed)` counts
    ///
    /// Creations are dispatched concurrently and all joined before
    /// returning. One busy or unmounted dataset does not block the rest;
    /// partial success is expected.
    pub async fn run(&self) -> (u64, u64) {
        let datasets = match self.engine.list_datasets(&self.pool).await {
            Ok(datasets) => datasets,
            Err(err) => {
                tracing::warn!(pool = %self.pool, %err, "skipping snapshot creation: dataset listing unavailable");
                return (0, 0);
            }
        };

        let mut tasks = JoinSet::new();
        for dataset in datasets {
            let engine = self.engine.clone();
            let label = self.label.clone();
            tasks.spawn(async move {
                match engine.create_snapshot(&dataset, &label).await {
                    Ok(()) => {
                        tracing::info!(snapshot = %format!("{dataset}@{label}"), "created snapshot");
                        true
                    }
                    Err(err) => {
                        tracing::warn!(dataset = %dataset, %err, "failed to create snapshot");
                        false
                    }
                }
            });
        }

        let mut created = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => created += 1,
                Ok(false) => failed += 1,
                Err(err) => {
                    tracing::error!(%err, "create task panicked");
                    failed += 1;
                }
            }
        }

        tracing::info!(pool = %self.pool, label = %self.label, created, failed, "snapshot creation complete");
        (created, failed)
    }
}

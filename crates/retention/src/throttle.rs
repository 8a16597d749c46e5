//! Bounded concurrent destroy dispatch

use engine::{EngineRef, Snapshot};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Process-wide cap on concurrently in-flight destroy operations
///
/// Shared by the consolidator and evictor of one run so a reap of thousands
/// of snapshots cannot overwhelm the storage engine. Creations are not
/// throttled.
#[derive(Clone)]
pub struct Throttle {
    permits: Arc<Semaphore>,
}

impl Throttle {
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
        }
    }

    /// Block until an in-flight slot is free
    ///
    /// The permit is released when the holding task drops it on completion.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // The semaphore is never closed while a Throttle exists
        self.permits
            .clone()
            .acquire_owned()
            .await
            .expect("throttle semaphore closed")
    }
}

/// Dispatch one throttled, fire-and-forget destroy into `tasks`
///
/// Blocks until the throttle admits the dispatch, then spawns. The task
/// resolves to `true` on success; per-entity failure is logged and resolves
/// to `false`, never propagating. The caller joins `tasks` at its
/// synchronization points.
pub(crate) async fn dispatch_destroy(
    tasks: &mut JoinSet<bool>,
    engine: &EngineRef,
    throttle: &Throttle,
    snapshot: &Snapshot,
) {
    let permit = throttle.acquire().await;
    let engine = engine.clone();
    let snapshot = snapshot.clone();

    tasks.spawn(async move {
        let name = snapshot.full_name();
        let result = engine
            .destroy_snapshot(&snapshot.dataset, &snapshot.label)
            .await;
        drop(permit);

        match result {
            Ok(()) => {
                tracing::info!(snapshot = %name, "destroyed snapshot");
                true
            }
            Err(err) => {
                tracing::warn!(snapshot = %name, %err, "failed to destroy snapshot");
                false
            }
        }
    });
}

/// Join every outstanding destroy in `tasks`, returning how many succeeded
pub(crate) async fn join_destroys(tasks: &mut JoinSet<bool>) -> u64 {
    let mut succeeded = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(true) => succeeded += 1,
            Ok(false) => {}
            Err(err) => tracing::error!(%err, "destroy task panicked"),
        }
    }
    succeeded
}

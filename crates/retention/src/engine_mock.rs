//! Scripted in-memory engine for decision-engine tests
//!
//! Models free space as a single number that grows by a fixed amount per
//! completed destroy, records operation orders, and exposes failure
//! switches for the conservative-path tests.

use async_trait::async_trait;
use engine::{Engine, EngineError, RawSpace, Snapshot, SpaceUnit};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    snapshots: Vec<Snapshot>,
    datasets: Vec<String>,
    free_gib: u64,
    reclaim_per_destroy: u64,
    destroyed: Vec<Snapshot>,
    created: Vec<(String, String)>,
    space_queries: u64,
    catalog_queries: u64,
}

pub struct MockEngine {
    state: Mutex<MockState>,
    fail_space: bool,
    fail_catalog: bool,
    fail_datasets: bool,
    fail_destroy_dataset: Option<String>,
    fail_create_dataset: Option<String>,
    destroy_delay: Duration,
    in_flight_destroys: AtomicU64,
    max_in_flight: AtomicU64,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            fail_space: false,
            fail_catalog: false,
            fail_datasets: false,
            fail_destroy_dataset: None,
            fail_create_dataset: None,
            destroy_delay: Duration::ZERO,
            in_flight_destroys: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
        }
    }

    pub fn with_snapshots(self, snapshots: Vec<Snapshot>) -> Self {
        self.state.lock().snapshots = snapshots;
        self
    }

    pub fn with_datasets(self, datasets: Vec<String>) -> Self {
        self.state.lock().datasets = datasets;
        self
    }

    pub fn with_free_gib(self, free_gib: u64) -> Self {
        self.state.lock().free_gib = free_gib;
        self
    }

    /// Every completed destroy frees this many modeled GiB
    pub fn with_reclaim_per_destroy(self, gib: u64) -> Self {
        self.state.lock().reclaim_per_destroy = gib;
        self
    }

    pub fn with_space_failure(mut self) -> Self {
        self.fail_space = true;
        self
    }

    pub fn with_catalog_failure(mut self) -> Self {
        self.fail_catalog = true;
        self
    }

    pub fn with_dataset_failure(mut self) -> Self {
        self.fail_datasets = true;
        self
    }

    pub fn with_destroy_failure(mut self, dataset: &str) -> Self {
        self.fail_destroy_dataset = Some(dataset.to_string());
        self
    }

    pub fn with_create_failure(mut self, dataset: &str) -> Self {
        self.fail_create_dataset = Some(dataset.to_string());
        self
    }

    pub fn with_destroy_delay_ms(mut self, millis: u64) -> Self {
        self.destroy_delay = Duration::from_millis(millis);
        self
    }

    /// Snapshots still present
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.state.lock().snapshots.clone()
    }

    /// Destroy calls in completion order
    pub fn destroyed(&self) -> Vec<Snapshot> {
        self.state.lock().destroyed.clone()
    }

    /// `(dataset, label)` pairs created, in completion order
    pub fn created(&self) -> Vec<(String, String)> {
        self.state.lock().created.clone()
    }

    pub fn space_queries(&self) -> u64 {
        self.state.lock().space_queries
    }

    pub fn catalog_queries(&self) -> u64 {
        self.state.lock().catalog_queries
    }

    /// Highest number of destroys observed in flight at once
    pub fn max_in_flight_destroys(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn command_error(what: &str) -> EngineError {
        EngineError::Command {
            program: "mock".to_string(),
            args: what.to_string(),
            status: 1,
            stderr: format!("{what} unavailable"),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn list_datasets(&self, root: &str) -> Result<Vec<String>, EngineError> {
        if self.fail_datasets {
            return Err(Self::command_error("dataset listing"));
        }
        let state = self.state.lock();
        Ok(state
            .datasets
            .iter()
            .filter(|ds| ds.as_str() == root || ds.starts_with(&format!("{root}/")))
            .cloned()
            .collect())
    }

    async fn list_snapshots(&self) -> Result<Vec<Snapshot>, EngineError> {
        let mut state = self.state.lock();
        state.catalog_queries += 1;
        if self.fail_catalog {
            return Err(Self::command_error("snapshot listing"));
        }
        Ok(state.snapshots.clone())
    }

    async fn available_space(&self, _pool: &str) -> Result<RawSpace, EngineError> {
        let mut state = self.state.lock();
        state.space_queries += 1;
        if self.fail_space {
            return Err(Self::command_error("pool query"));
        }
        Ok(RawSpace {
            magnitude: state.free_gib as f64,
            unit: SpaceUnit::Gib,
        })
    }

    async fn create_snapshot(&self, dataset: &str, label: &str) -> Result<(), EngineError> {
        if self.fail_create_dataset.as_deref() == Some(dataset) {
            return Err(Self::command_error("create"));
        }
        let mut state = self.state.lock();
        let epoch = 1 + state.snapshots.len() as i64;
        state.snapshots.push(Snapshot {
            dataset: dataset.to_string(),
            label: label.to_string(),
            creation_epoch: epoch,
        });
        state
            .created
            .push((dataset.to_string(), label.to_string()));
        Ok(())
    }

    async fn destroy_snapshot(&self, dataset: &str, label: &str) -> Result<(), EngineError> {
        let in_flight = self.in_flight_destroys.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.destroy_delay.is_zero() {
            tokio::time::sleep(self.destroy_delay).await;
        }

        let result = if self.fail_destroy_dataset.as_deref() == Some(dataset) {
            Err(Self::command_error("destroy"))
        } else {
            let mut state = self.state.lock();
            // Absent snapshots destroy cleanly, matching the engine contract
            if let Some(pos) = state
                .snapshots
                .iter()
                .position(|s| s.dataset == dataset && s.label == label)
            {
                let snap = state.snapshots.remove(pos);
                let reclaim = state.reclaim_per_destroy;
                state.free_gib += reclaim;
                state.destroyed.push(snap);
            } else {
                state.destroyed.push(Snapshot {
                    dataset: dataset.to_string(),
                    label: label.to_string(),
                    creation_epoch: 0,
                });
            }
            Ok(())
        };

        self.in_flight_destroys.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

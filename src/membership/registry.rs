use super::types::{WorkerNode, WorkerState};
use crate::executor::protocol::WORKER_ENDPOINT_STATUS;
use crate::executor::types::now_ms;

use anyhow::Result;
use futures::future::join_all;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Configured shard workers and their liveness.
///
/// The worker list keeps configuration order; `live_workers` returns the alive subset in
/// that order.
pub struct WorkerRegistry {
    workers: RwLock<Vec<WorkerNode>>,
    http_client: reqwest::Client,
}

impl WorkerRegistry {
    pub fn new<S: AsRef<str>>(endpoints: &[S]) -> Arc<Self> {
        let workers = endpoints
            .iter()
            .map(|endpoint| WorkerNode::new(endpoint.as_ref()))
            .collect();

        Arc::new(Self {
            workers: RwLock::new(workers),
            http_client: reqwest::Client::new(),
        })
    }

    pub fn live_workers(&self) -> Vec<WorkerNode> {
        self.workers
            .read()
            .iter()
            .filter(|worker| worker.is_alive())
            .cloned()
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.workers
            .read()
            .iter()
            .filter(|worker| worker.is_alive())
            .count()
    }

    pub fn all_workers(&self) -> Vec<WorkerNode> {
        self.workers.read().clone()
    }

    /// Probes every live worker concurrently and drops the ones that fail.
    ///
    /// Each probe is bounded by `timeout`, so the whole round takes about one timeout at
    /// worst. Returns the number of workers still alive.
    pub async fn probe_and_prune(&self, timeout: Duration) -> usize {
        let candidates = self.live_workers();

        let outcomes = join_all(
            candidates
                .iter()
                .map(|worker| self.probe(worker, timeout)),
        )
        .await;

        let failed: Vec<String> = candidates
            .iter()
            .zip(outcomes)
            .filter_map(|(worker, outcome)| match outcome {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        "Worker {} failed liveness probe, removing it: {}",
                        worker.endpoint,
                        e
                    );
                    Some(worker.endpoint.clone())
                }
            })
            .collect();

        let probed_at = now_ms();
        let mut workers = self.workers.write();

        // Rebuild the list from the collected outcomes instead of editing it while probing.
        let updated: Vec<WorkerNode> = workers
            .iter()
            .map(|worker| {
                let mut worker = worker.clone();
                if failed.contains(&worker.endpoint) {
                    worker.state = WorkerState::Dead;
                    worker.last_probe_ms = Some(probed_at);
                } else if candidates.iter().any(|c| c.endpoint == worker.endpoint) {
                    worker.last_probe_ms = Some(probed_at);
                }
                worker
            })
            .collect();
        *workers = updated;

        let alive = workers.iter().filter(|worker| worker.is_alive()).count();
        if !failed.is_empty() {
            tracing::info!("Worker pool now: {} of {} alive", alive, workers.len());
        }
        alive
    }

    /// Marks a worker dead without probing it.
    pub fn mark_dead(&self, endpoint: &str) {
        let mut workers = self.workers.write();
        if let Some(worker) = workers.iter_mut().find(|w| w.endpoint == endpoint) {
            worker.state = WorkerState::Dead;
        }
    }

    async fn probe(&self, worker: &WorkerNode, timeout: Duration) -> Result<()> {
        let response = self
            .http_client
            .get(worker.url(WORKER_ENDPOINT_STATUS))
            .timeout(timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("status probe returned {}", response.status()));
        }

        tracing::trace!("Worker {} is alive", worker.endpoint);
        Ok(())
    }
}

//! Coordinator
//!
//! Ties the tracker, the worker registry, the dispatcher, the enrichment pipeline and the
//! result cache together. HTTP handlers call into it; it owns every background task that
//! moves a job forward.

use super::dispatcher::Dispatcher;
use super::protocol::NodeDataRequest;
use super::tracker::JobTracker;
use super::types::*;
use crate::config::CoordinatorConfig;
use crate::enrichment::pipeline::Enricher;
use crate::enrichment::source::MetadataSource;
use crate::enrichment::types::EnrichedResult;
use crate::error::{CoordinatorError, Result};
use crate::membership::registry::WorkerRegistry;
use crate::search::aggregator::aggregate;
use crate::search::types::{RankedResult, TOP_K};
use crate::storage::cache::ResultCache;

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Outcome of a submission that was not rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitReply {
    /// A finished (or finishing) result already exists for this sequence.
    Cached(JobId),
    /// Bound to a slot and dispatched to every live worker.
    Admitted(JobId),
    /// Waiting in the backlog for a free slot.
    Queued(JobId),
}

impl SubmitReply {
    pub fn qid(&self) -> &JobId {
        match self {
            SubmitReply::Cached(id) | SubmitReply::Admitted(id) | SubmitReply::Queued(id) => id,
        }
    }
}

/// Outcome of accepting one shard reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyAck {
    Waiting { received: usize, expected: usize },
    /// Fan-in complete; the job left its slot.
    Complete,
}

/// What a poll sees for a query id.
#[derive(Debug, Clone, PartialEq)]
pub enum PollReply {
    Done(EnrichedResult),
    /// Ranked, metadata lookup still running.
    Enriching,
    InQueue,
    Partial { received: usize, expected: usize },
    NotFound,
}

/// Point-in-time counters for `/status` and the stats reporter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinatorStats {
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub live_workers: usize,
    pub cached_results: usize,
}

pub struct Coordinator {
    tracker: JobTracker,
    registry: Arc<WorkerRegistry>,
    dispatcher: Dispatcher,
    enricher: Enricher,
    cache: Arc<ResultCache>,
    /// Finished results that could not be written to the cache.
    ready: DashMap<JobId, EnrichedResult>,
    probe_timeout: Duration,
}

impl Coordinator {
    pub fn new(
        config: &CoordinatorConfig,
        registry: Arc<WorkerRegistry>,
        source: Arc<dyn MetadataSource>,
        cache: Arc<ResultCache>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tracker: JobTracker::new(
                config.max_active_jobs,
                registry.clone(),
                config.reply_timeout(),
            ),
            registry,
            dispatcher: Dispatcher::new(config.dispatch_timeout()),
            enricher: Enricher::with_genbank(source),
            cache,
            ready: DashMap::new(),
            probe_timeout: config.probe_timeout(),
        })
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            active_jobs: self.tracker.active_count(),
            queued_jobs: self.tracker.backlog_len(),
            live_workers: self.registry.live_count(),
            cached_results: self.cache.len(),
        }
    }

    /// Accepts a raw sequence for searching.
    ///
    /// Known results short-circuit before any worker is contacted. Otherwise the workers are
    /// probed, and the job is admitted and dispatched, queued, or rejected as a duplicate.
    /// A job that finishes while the probe runs is still answered as cached.
    pub async fn submit(self: &Arc<Self>, sequence: String) -> Result<SubmitReply> {
        if sequence.trim().is_empty() {
            return Err(CoordinatorError::EmptySequence);
        }

        let job = Job::new(sequence);
        let id = job.id.clone();

        if self.has_result(&id) {
            tracing::info!("Query {} already answered, skipping search", id);
            return Ok(SubmitReply::Cached(id));
        }

        let alive = self.registry.probe_and_prune(self.probe_timeout).await;
        if alive == 0 {
            tracing::warn!("Rejecting query {}: no worker nodes active", id);
            return Err(CoordinatorError::NoWorkersAvailable);
        }

        if self.has_result(&id) {
            tracing::info!("Query {} answered during probe, skipping search", id);
            return Ok(SubmitReply::Cached(id));
        }

        let stored = |id: &JobId| self.cache.has(id) || self.ready.contains_key(id);
        match self.tracker.submit_unless(job.clone(), stored) {
            SubmitOutcome::Duplicate => Err(CoordinatorError::Duplicate(id)),
            SubmitOutcome::Answered => Ok(SubmitReply::Cached(id)),
            SubmitOutcome::Queued => Ok(SubmitReply::Queued(id)),
            SubmitOutcome::Admitted { .. } => {
                self.dispatch(job);
                Ok(SubmitReply::Admitted(id))
            }
        }
    }

    /// Records one worker's results for an active job.
    ///
    /// Malformed records reject the whole reply without touching tracker state. A list
    /// longer than the ranking depth keeps only its best records.
    pub async fn accept_reply(
        self: &Arc<Self>,
        id: &JobId,
        request: NodeDataRequest,
    ) -> Result<ReplyAck> {
        let NodeDataRequest { nid, mut results } = request;

        for record in &results {
            record.validate().map_err(CoordinatorError::InvalidReply)?;
        }

        if results.len() > TOP_K {
            tracing::warn!(
                "Worker {} sent {} records for {}, keeping the best {}",
                nid,
                results.len(),
                id,
                TOP_K
            );
            results.sort_by(|a, b| b.score.cmp(&a.score));
            results.truncate(TOP_K);
        }

        match self.tracker.record_reply(id, results) {
            Ok(ReplyOutcome::Waiting { received, expected }) => {
                tracing::debug!("Worker {} reported for {} ({}/{})", nid, id, received, expected);
                Ok(ReplyAck::Waiting { received, expected })
            }
            Ok(ReplyOutcome::Complete(harvest)) => {
                tracing::info!("Worker {} completed fan-in for {}", nid, id);
                self.complete(harvest).await;
                Ok(ReplyAck::Complete)
            }
            Err(e) => {
                tracing::warn!("Rejected reply from worker {}: {}", nid, e);
                Err(e)
            }
        }
    }

    pub async fn poll(self: &Arc<Self>, id: &JobId) -> PollReply {
        if self.tracker.is_finishing(id) {
            return PollReply::Enriching;
        }
        if let Some(result) = self.ready.get(id) {
            return PollReply::Done(result.clone());
        }

        match self.cache.get(id).await {
            Ok(Some(entry)) if entry.payload.is_final() => return PollReply::Done(entry.payload),
            Ok(Some(entry)) => {
                // Ranked but never enriched, e.g. interrupted by a restart.
                self.resume_enrichment(entry.payload.ranked());
                return PollReply::Enriching;
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Cannot read cached result {}: {:#}", id, e),
        }

        match self.tracker.status(id) {
            JobStatus::NotFound => PollReply::NotFound,
            JobStatus::InQueue => PollReply::InQueue,
            JobStatus::Partial { received, expected } => PollReply::Partial { received, expected },
        }
    }

    /// Force-completes every job past its reply deadline. Returns how many were completed.
    pub async fn sweep_overdue(self: &Arc<Self>, now: Instant) -> usize {
        let harvests = self.tracker.expire_overdue(now);
        let count = harvests.len();
        for harvest in harvests {
            self.complete(harvest).await;
        }
        count
    }

    pub fn start_deadline_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.sweep_overdue(Instant::now()).await;
            }
        })
    }

    pub fn start_stats_reporter(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let stats = self.stats();
                tracing::info!(
                    "Coordinator stats: {} active, {} queued, {} live workers, {} cached",
                    stats.active_jobs,
                    stats.queued_jobs,
                    stats.live_workers,
                    stats.cached_results
                );
            }
        })
    }

    // --- Job lifecycle ---

    fn has_result(&self, id: &JobId) -> bool {
        self.cache.has(id) || self.tracker.is_finishing(id) || self.ready.contains_key(id)
    }

    /// Fans a job out to every live worker, one spawned send per worker.
    fn dispatch(self: &Arc<Self>, job: Job) {
        let workers = self.registry.live_workers();

        match self.tracker.set_expected_replies(&job.id, workers.len()) {
            Ok(None) => {}
            Ok(Some(harvest)) => {
                // Nobody left to ask; finish with what there is.
                let this = self.clone();
                tokio::spawn(async move { this.complete(harvest).await });
                return;
            }
            Err(e) => {
                tracing::warn!("Not dispatching {}: {}", job.id, e);
                return;
            }
        }

        tracing::info!("Dispatching {} to {} worker(s)", job.id, workers.len());
        let job = Arc::new(job);
        for worker in workers {
            let this = self.clone();
            let job = job.clone();
            tokio::spawn(async move {
                let Err(e) = this.dispatcher.send(&worker, &job).await else {
                    return;
                };
                tracing::warn!(
                    "Failed to send {} to {}, not waiting for its reply: {:#}",
                    job.id,
                    worker.endpoint,
                    e
                );
                match this.tracker.forfeit_reply(&job.id) {
                    Ok(Some(harvest)) => this.complete(harvest).await,
                    Ok(None) => {}
                    Err(e) => tracing::debug!("Forfeit for {} ignored: {}", job.id, e),
                }
            });
        }
    }

    /// Ranks a harvested job, persists the ranking, dispatches the promoted job and starts
    /// enrichment in the background.
    async fn complete(self: &Arc<Self>, harvest: Harvest) {
        let Harvest {
            job_id,
            shard_results,
            missing_replies,
            promoted,
        } = harvest;

        if missing_replies > 0 {
            tracing::warn!("Completing {} without {} reply(ies)", job_id, missing_replies);
        }

        let ranked = aggregate(shard_results, job_id.clone());

        if let Err(e) = self.cache.put(&job_id, EnrichedResult::pending(&ranked)).await {
            tracing::warn!("Could not persist ranked result {}: {:#}", job_id, e);
        }

        if let Some(next) = promoted {
            self.dispatch(next);
        }

        let this = self.clone();
        tokio::spawn(async move { this.enrich_and_store(ranked).await });
    }

    fn resume_enrichment(self: &Arc<Self>, ranked: RankedResult) {
        if self.tracker.begin_finishing(&ranked.qid) {
            tracing::info!("Resuming metadata retrieval for {}", ranked.qid);
            let this = self.clone();
            tokio::spawn(async move { this.enrich_and_store(ranked).await });
        }
    }

    async fn enrich_and_store(self: Arc<Self>, ranked: RankedResult) {
        let id = ranked.qid.clone();

        let result = match self.enricher.enrich(&ranked).await {
            Ok(enriched) => {
                tracing::info!("Metadata attached to {}", id);
                enriched
            }
            Err(e) => {
                tracing::warn!("Metadata retrieval failed for {}, serving bare ranking: {:#}", id, e);
                EnrichedResult::unavailable(&ranked)
            }
        };

        match self.cache.put(&id, result.clone()).await {
            Ok(()) => {
                self.ready.remove(&id);
            }
            Err(e) => {
                tracing::error!("Could not cache result {}, keeping it in memory: {:#}", id, e);
                self.ready.insert(id.clone(), result);
            }
        }

        self.tracker.finish(&id);
    }
}

//! Job Tracker
//!
//! Admission control over a fixed number of active slots, a FIFO backlog for overflow, and
//! per-job accumulation of shard replies.
//!
//! ## Concurrency
//! All state lives in one `TrackerState` behind a single mutex. Every public operation is
//! one critical section and never performs I/O while holding the lock. Completion checks,
//! harvesting and backlog promotion happen inside the same critical section as the reply
//! that triggered them, so a freed slot is handed to the backlog head before any other
//! caller can see it as free, and a job is harvested at most once.
//!
//! A harvested id stays marked as finishing until the coordinator has stored its result, so
//! a resubmission arriving in between is answered from the pending result instead of being
//! admitted again.

use super::types::*;
use crate::error::{CoordinatorError, Result};
use crate::membership::registry::WorkerRegistry;
use crate::search::types::ShardResult;

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A job bound to a slot, collecting replies.
#[derive(Debug)]
struct ActiveJob {
    job: Job,
    replies: Vec<Vec<ShardResult>>,
    /// Number of replies that completes the fan-in.
    expected_replies: usize,
    /// Force-completion time; `None` when deadlines are disabled.
    deadline: Option<Instant>,
}

impl ActiveJob {
    fn is_complete(&self) -> bool {
        self.replies.len() >= self.expected_replies
    }
}

#[derive(Debug)]
struct TrackerState {
    slots: Vec<Option<ActiveJob>>,
    backlog: VecDeque<Job>,
    /// Harvested or resumed ids whose result is not stored yet.
    finishing: HashSet<JobId>,
}

impl TrackerState {
    fn slot_of(&self, id: &JobId) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|active| &active.job.id == id))
    }

    fn is_queued(&self, id: &JobId) -> bool {
        self.backlog.iter().any(|job| &job.id == id)
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }
}

pub struct JobTracker {
    state: Mutex<TrackerState>,
    registry: Arc<WorkerRegistry>,
    reply_timeout: Option<Duration>,
}

impl JobTracker {
    /// Creates a tracker with `max_active` slots.
    ///
    /// `reply_timeout` bounds how long an active job waits for its shards before it is
    /// force-completed by [`JobTracker::expire_overdue`].
    pub fn new(
        max_active: usize,
        registry: Arc<WorkerRegistry>,
        reply_timeout: Option<Duration>,
    ) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                slots: (0..max_active).map(|_| None).collect(),
                backlog: VecDeque::new(),
                finishing: HashSet::new(),
            }),
            registry,
            reply_timeout,
        }
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().slots.len()
    }

    /// Offers a new job.
    ///
    /// Duplicate if the id is already active or queued, Answered if it is finishing,
    /// Admitted if a slot was free (the job is bound to it immediately), Queued otherwise.
    pub fn submit(&self, job: Job) -> SubmitOutcome {
        self.submit_unless(job, |_| false)
    }

    /// Like [`JobTracker::submit`], but answers `Answered` when `stored(id)` holds.
    ///
    /// `stored` runs under the tracker lock. Results are stored before their finishing mark
    /// is cleared, so every id is seen as active, queued, finishing or stored.
    pub fn submit_unless(&self, job: Job, stored: impl FnOnce(&JobId) -> bool) -> SubmitOutcome {
        let mut state = self.state.lock();

        if state.finishing.contains(&job.id) || stored(&job.id) {
            tracing::debug!("Job {} is finishing, not admitting it again", job.id);
            return SubmitOutcome::Answered;
        }

        if state.slot_of(&job.id).is_some() || state.is_queued(&job.id) {
            tracing::debug!("Rejecting duplicate job {}", job.id);
            return SubmitOutcome::Duplicate;
        }

        match state.free_slot() {
            Some(slot) => {
                tracing::info!("Job {} admitted to slot {}", job.id, slot);
                state.slots[slot] = Some(self.activate(job));
                SubmitOutcome::Admitted { slot }
            }
            None => {
                tracing::info!(
                    "All {} slots busy, job {} queued (backlog: {})",
                    state.slots.len(),
                    job.id,
                    state.backlog.len() + 1
                );
                state.backlog.push_back(job);
                SubmitOutcome::Queued
            }
        }
    }

    /// Appends one shard's result list to an active job.
    ///
    /// If the reply completes the fan-in the job is harvested in the same critical section
    /// and the caller receives [`ReplyOutcome::Complete`]. Fails with `UnknownJob` when the id
    /// is not active (never submitted, still queued, or already harvested).
    pub fn record_reply(&self, id: &JobId, results: Vec<ShardResult>) -> Result<ReplyOutcome> {
        let mut state = self.state.lock();

        let slot = state
            .slot_of(id)
            .ok_or_else(|| CoordinatorError::UnknownJob(id.clone()))?;

        let (received, expected, complete) = {
            let active = state.slots[slot]
                .as_mut()
                .ok_or_else(|| CoordinatorError::UnknownJob(id.clone()))?;
            active.replies.push(results);
            (
                active.replies.len(),
                active.expected_replies,
                active.is_complete(),
            )
        };

        tracing::debug!("Job {}: {} of {} replies received", id, received, expected);

        if complete {
            self.harvest_slot(&mut state, slot)
                .map(ReplyOutcome::Complete)
                .ok_or_else(|| CoordinatorError::UnknownJob(id.clone()))
        } else {
            Ok(ReplyOutcome::Waiting { received, expected })
        }
    }

    /// True iff the job is active and every expected reply has arrived.
    pub fn is_complete(&self, id: &JobId) -> bool {
        let state = self.state.lock();
        state
            .slot_of(id)
            .and_then(|slot| state.slots[slot].as_ref())
            .is_some_and(ActiveJob::is_complete)
    }

    /// Removes an active job, returning its accumulated replies.
    ///
    /// The slot is freed and, if the backlog is non-empty, immediately handed to the
    /// backlog head (returned in [`Harvest::promoted`]). A second call for the same id fails.
    pub fn harvest_and_free(&self, id: &JobId) -> Result<Harvest> {
        let mut state = self.state.lock();
        state
            .slot_of(id)
            .and_then(|slot| self.harvest_slot(&mut state, slot))
            .ok_or_else(|| CoordinatorError::UnknownJob(id.clone()))
    }

    /// Moves the backlog head into a free slot, if both exist.
    pub fn promote_from_backlog(&self) -> Option<Job> {
        let mut state = self.state.lock();
        self.promote_locked(&mut state)
    }

    /// Overrides the number of replies a job waits for.
    ///
    /// Called by the dispatcher with the number of workers actually targeted. Harvests the
    /// job if the replies already received satisfy the new count.
    pub fn set_expected_replies(&self, id: &JobId, expected: usize) -> Result<Option<Harvest>> {
        self.adjust_expected(id, |_| expected)
    }

    /// Gives up on one reply for a job, after a send to one of its workers failed.
    pub fn forfeit_reply(&self, id: &JobId) -> Result<Option<Harvest>> {
        self.adjust_expected(id, |expected| expected.saturating_sub(1))
    }

    fn adjust_expected(
        &self,
        id: &JobId,
        update: impl FnOnce(usize) -> usize,
    ) -> Result<Option<Harvest>> {
        let mut state = self.state.lock();
        let slot = state
            .slot_of(id)
            .ok_or_else(|| CoordinatorError::UnknownJob(id.clone()))?;

        let complete = match state.slots[slot].as_mut() {
            Some(active) => {
                active.expected_replies = update(active.expected_replies);
                active.is_complete()
            }
            None => return Err(CoordinatorError::UnknownJob(id.clone())),
        };

        if complete {
            Ok(self.harvest_slot(&mut state, slot))
        } else {
            Ok(None)
        }
    }

    /// Force-completes every active job whose deadline has passed at `now`.
    ///
    /// Missing shards are treated as empty result lists.
    pub fn expire_overdue(&self, now: Instant) -> Vec<Harvest> {
        let mut state = self.state.lock();

        let overdue: Vec<usize> = state
            .slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| {
                let active = entry.as_ref()?;
                let deadline = active.deadline?;
                (now >= deadline).then_some(slot)
            })
            .collect();

        overdue
            .into_iter()
            .filter_map(|slot| self.harvest_slot(&mut state, slot))
            .inspect(|harvest| {
                tracing::warn!(
                    "Job {} hit its reply deadline with {} reply(ies) missing",
                    harvest.job_id,
                    harvest.missing_replies
                );
            })
            .collect()
    }

    pub fn status(&self, id: &JobId) -> JobStatus {
        let state = self.state.lock();

        if let Some(active) = state.slot_of(id).and_then(|slot| state.slots[slot].as_ref()) {
            return JobStatus::Partial {
                received: active.replies.len(),
                expected: active.expected_replies,
            };
        }
        if state.is_queued(id) {
            return JobStatus::InQueue;
        }
        JobStatus::NotFound
    }

    /// Marks an id as finishing outside a harvest, e.g. to resume a stored ranking.
    ///
    /// False if it was already finishing.
    pub fn begin_finishing(&self, id: &JobId) -> bool {
        self.state.lock().finishing.insert(id.clone())
    }

    /// Clears the finishing mark once the result is stored.
    pub fn finish(&self, id: &JobId) {
        self.state.lock().finishing.remove(id);
    }

    pub fn is_finishing(&self, id: &JobId) -> bool {
        self.state.lock().finishing.contains(id)
    }

    /// True if the id is active or queued.
    pub fn contains(&self, id: &JobId) -> bool {
        let state = self.state.lock();
        state.slot_of(id).is_some() || state.is_queued(id)
    }

    pub fn active_count(&self) -> usize {
        self.state
            .lock()
            .slots
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    pub fn backlog_len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    // --- Locked helpers ---

    fn activate(&self, job: Job) -> ActiveJob {
        ActiveJob {
            job,
            replies: Vec::new(),
            expected_replies: self.registry.live_count(),
            deadline: self.reply_timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    fn promote_locked(&self, state: &mut TrackerState) -> Option<Job> {
        let slot = state.free_slot()?;
        let job = state.backlog.pop_front()?;

        tracing::info!("Promoting job {} from backlog into slot {}", job.id, slot);
        state.slots[slot] = Some(self.activate(job.clone()));
        Some(job)
    }

    /// Empties `slot`, marks its job finishing and refills the slot from the backlog.
    /// `None` if the slot was already free.
    fn harvest_slot(&self, state: &mut TrackerState, slot: usize) -> Option<Harvest> {
        let active = state.slots.get_mut(slot)?.take()?;
        state.finishing.insert(active.job.id.clone());
        let promoted = self.promote_locked(state);

        let missing_replies = active
            .expected_replies
            .saturating_sub(active.replies.len());
        tracing::info!(
            "Job {} harvested from slot {} ({} replies)",
            active.job.id,
            slot,
            active.replies.len()
        );

        Some(Harvest {
            job_id: active.job.id,
            shard_results: active.replies,
            missing_replies,
            promoted,
        })
    }
}

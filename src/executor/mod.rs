//! Job Execution Module
//!
//! Turns submitted sequences into ranked, enriched answers by fanning each job out to every
//! live shard worker and fanning the replies back in.
//!
//! ## Architecture Overview
//! 1. **Admission**: A submission is hashed into a `JobId`. Known results short-circuit; new
//!    jobs take one of a fixed number of active slots or wait in a FIFO backlog.
//! 2. **Fan-out**: An admitted job is sent to every live worker concurrently. A send that fails
//!    reduces the number of replies the job waits for.
//! 3. **Fan-in**: Workers call back with their partial results. The reply that completes the
//!    set harvests the job, frees its slot and promotes the backlog head in one step.
//! 4. **Completion**: The harvest is ranked and persisted immediately; metadata enrichment runs
//!    in the background and overwrites the cached entry when done.
//! 5. **Deadlines**: A sweeper force-completes jobs whose workers stopped answering.
//!
//! ## Submodules
//! - **`tracker`**: Slot/backlog bookkeeping under a single lock.
//! - **`dispatcher`**: Outbound job delivery with retry and backoff.
//! - **`coordinator`**: Orchestrates the lifecycle above and owns the background tasks.
//! - **`protocol`**: HTTP contracts of the coordinator and worker surfaces.
//! - **`handlers`**: axum handlers for the coordinator surface.

pub mod coordinator;
pub mod dispatcher;
pub mod handlers;
pub mod protocol;
pub mod tracker;
pub mod types;

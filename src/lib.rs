//! Distributed Sequence Search Coordinator Library
//!
//! The coordinator accepts a query sequence, fans it out to every live shard worker, merges
//! their partial hits into a global top-K ranking, attaches bibliographic metadata and keeps
//! the answer in a durable cache until the client polls for it.
//!
//! ## Architecture Modules
//! - **`membership`**: Configured shard workers and their liveness, probed over HTTP.
//! - **`executor`**: Job tracking (slots, backlog, fan-in), dispatch, orchestration and the
//!   HTTP handlers.
//! - **`search`**: Result types and the top-K aggregation of shard replies.
//! - **`enrichment`**: Metadata lookup against the bibliographic service, with a flat-file
//!   fallback for records without linked publications.
//! - **`storage`**: The capacity-bounded, disk-backed result cache.

pub mod config;
pub mod enrichment;
pub mod error;
pub mod executor;
pub mod membership;
pub mod search;
pub mod server;
pub mod storage;

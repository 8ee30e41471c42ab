//! Worker Registry Module
//!
//! Tracks the configured shard worker nodes and which of them are reachable.
//!
//! ## Core Mechanisms
//! - **Liveness probing**: Before a new submission is accepted, every live worker is probed
//!   (`GET /status`) concurrently with a bounded timeout.
//! - **Pruning**: A worker that errors or times out is marked `Dead` and stays out of rotation
//!   for the rest of the process lifetime, so fan-out never targets a shard that cannot reply.

pub mod registry;
pub mod types;

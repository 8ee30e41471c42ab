//! Result Cache Module
//!
//! Durable, capacity-bounded store of finished query results.
//!
//! ## Core Concepts
//! - **Layout**: One JSON file per query (`{qid}.json`) in the cache directory, written to a
//!   temporary file and renamed into place so readers never see a partial write.
//! - **Index**: An in-memory map of id to creation stamp, rebuilt from the directory on open.
//! - **Eviction**: When a new entry would exceed capacity, the entry with the oldest creation
//!   stamp is removed first.

pub mod cache;
pub mod types;

#[cfg(test)]
mod tests;

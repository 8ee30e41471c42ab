use crate::enrichment::types::EnrichedResult;
use crate::executor::types::JobId;
use serde::{Deserialize, Serialize};

/// One cached result as stored on disk (`{id}.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub id: JobId,
    /// Millisecond stamp of the first write; strictly increasing within a process.
    pub created_at: u64,
    pub payload: EnrichedResult,
}

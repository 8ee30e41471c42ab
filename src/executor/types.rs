use crate::error::CoordinatorError;
use crate::search::types::ShardResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content fingerprint of a submitted sequence.
///
/// Lowercase hex SHA-256 of the raw sequence bytes. The same bytes always yield the same id,
/// which makes it usable as the dedup key, the slot key, the cache file name and the poll
/// token handed back to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct JobId(String);

impl JobId {
    /// Length of the hex encoded digest.
    pub const LEN: usize = 64;

    pub fn from_sequence(sequence: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(sequence)))
    }

    /// Validates an externally supplied id (path parameter, file name).
    pub fn parse(raw: &str) -> Result<Self, CoordinatorError> {
        let valid = raw.len() == Self::LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(CoordinatorError::InvalidJobId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobId {
    type Error = CoordinatorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        JobId::parse(&value)
    }
}

impl From<JobId> for String {
    fn from(id: JobId) -> Self {
        id.0
    }
}

/// A submitted query as the tracker knows it before it is bound to a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub sequence: String,
}

impl Job {
    pub fn new(sequence: String) -> Self {
        Self {
            id: JobId::from_sequence(sequence.as_bytes()),
            sequence,
        }
    }
}

/// Result of offering a job to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The id is already active or waiting in the backlog.
    Duplicate,
    /// The id was harvested and its result is still being finished.
    Answered,
    /// All slots are busy; the job was appended to the backlog.
    Queued,
    /// The job took the given slot and must be dispatched now.
    Admitted { slot: usize },
}

/// Everything released from a slot when a job leaves the tracker.
#[derive(Debug, Clone)]
pub struct Harvest {
    pub job_id: JobId,
    /// One entry per reply received, in arrival order.
    pub shard_results: Vec<Vec<ShardResult>>,
    /// Replies that were expected but never arrived (deadline expiry).
    pub missing_replies: usize,
    /// Backlog head moved into the freed slot, to be dispatched by the caller.
    pub promoted: Option<Job>,
}

/// Result of recording one shard reply.
#[derive(Debug, Clone)]
pub enum ReplyOutcome {
    /// Fan-in still incomplete.
    Waiting { received: usize, expected: usize },
    /// This reply completed the fan-in; the job has been harvested.
    Complete(Harvest),
}

/// Tracker-side view of a job, used for polling.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    NotFound,
    InQueue,
    Partial { received: usize, expected: usize },
}

/// Helper to get the current system time in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

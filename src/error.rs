use crate::executor::types::JobId;
use thiserror::Error;

/// Caller-visible failures of the coordinator.
///
/// Each variant maps onto one of the status codes of the coordinator HTTP surface, so a
/// polling client can tell "try again later" apart from "this query does not exist".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    #[error("Duplicate request for query {0}")]
    Duplicate(JobId),

    #[error("No worker nodes available")]
    NoWorkersAvailable,

    #[error("Query {0} is not an active job")]
    UnknownJob(JobId),

    #[error("Invalid query id: {0}")]
    InvalidJobId(String),

    #[error("Invalid shard reply: {0}")]
    InvalidReply(String),

    #[error("Empty sequence")]
    EmptySequence,
}

impl CoordinatorError {
    /// HTTP status code reported for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CoordinatorError::Duplicate(_) => 260,
            CoordinatorError::NoWorkersAvailable => 500,
            CoordinatorError::UnknownJob(_) => 400,
            CoordinatorError::InvalidJobId(_) => 400,
            CoordinatorError::InvalidReply(_) => 400,
            CoordinatorError::EmptySequence => 400,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

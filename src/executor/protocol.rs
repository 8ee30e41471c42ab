//! Network Protocol Definitions
//!
//! Defines the Data Transfer Objects (DTOs) exchanged with the submitting client, the shard
//! workers and polling pages.
//!
//! Constants define the endpoints of both the coordinator and the worker HTTP surfaces.

use super::types::JobId;
use crate::enrichment::types::EnrichedResult;
use crate::search::types::ShardResult;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Coordinator endpoints ---

pub const ENDPOINT_STATUS: &str = "/status";
pub const ENDPOINT_PLUGIN_REQUEST: &str = "/plugin_request";
pub const ENDPOINT_NODE_DATA: &str = "/node_data";
pub const ENDPOINT_PLUGIN_POLL: &str = "/plugin_poll";

// --- Worker endpoints ---

pub const WORKER_ENDPOINT_STATUS: &str = "/status";
pub const WORKER_ENDPOINT_REQUEST: &str = "/api/request";

// --- Status texts ---

pub const STATUS_RUNNING: &str = "The server is running";
pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_DUPLICATE: &str = "Error: Duplicate Request";
pub const STATUS_NO_WORKERS: &str = "No worker nodes active";
pub const STATUS_EMPTY_SEQUENCE: &str = "Error: Empty sequence";
pub const STATUS_BAD_REQUEST: &str = "Error: Bad request";
pub const STATUS_SENT: &str = "sent";
pub const STATUS_WAITING: &str = "waiting";
pub const STATUS_BAD_NODE_DATA: &str = "Bad call to node data";

pub const STATE_DONE: &str = "Done";
pub const STATE_IN_QUEUE: &str = "Query still in queue";
pub const STATE_NOT_FOUND: &str = "Query not found";
pub const STATE_RETRIEVING: &str = "Retrieving metadata ...";

/// Poll state of an active job, e.g. `1 of 2 workers finished`.
pub fn partial_state(received: usize, expected: usize) -> String {
    format!("{} of {} workers finished", received, expected)
}

/// Response to `POST /plugin_request`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qid: Option<JobId>,
}

/// Identifier a worker reports about itself; sent as either a number or a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WorkerTag {
    Number(u64),
    Text(String),
}

impl fmt::Display for WorkerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerTag::Number(n) => write!(f, "{}", n),
            WorkerTag::Text(s) => f.write_str(s),
        }
    }
}

/// Body of `POST /node_data/{qid}`: one shard's results for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDataRequest {
    pub nid: WorkerTag,
    #[serde(default)]
    pub results: Vec<ShardResult>,
}

/// Response to `POST /node_data/{qid}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeDataResponse {
    pub status: String,
}

/// Response to `GET /plugin_poll/{qid}`.
///
/// `State` is always present; the finished payload is flattened in next to it once the
/// query is done.
#[derive(Debug, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(rename = "State")]
    pub state: String,
    #[serde(flatten)]
    pub result: Option<EnrichedResult>,
}

impl PollResponse {
    pub fn pending(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            result: None,
        }
    }

    pub fn done(result: EnrichedResult) -> Self {
        Self {
            state: STATE_DONE.to_string(),
            result: Some(result),
        }
    }
}

/// Response to `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub active_jobs: usize,
    pub queued_jobs: usize,
    pub live_workers: usize,
}

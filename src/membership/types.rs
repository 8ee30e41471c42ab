use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WorkerState {
    Alive,
    /// Failed a liveness probe. Dead workers never rejoin within the process lifetime.
    Dead,
}

/// A shard worker node as configured at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerNode {
    /// Base URL without trailing slash, e.g. `http://10.0.0.4:80`.
    pub endpoint: String,
    pub state: WorkerState,
    /// Timestamp (ms) of the last probe outcome, if any.
    pub last_probe_ms: Option<u64>,
}

impl WorkerNode {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: normalize_endpoint(endpoint),
            state: WorkerState::Alive,
            last_probe_ms: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state == WorkerState::Alive
    }

    /// Absolute URL of a path on this worker.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

/// Prepends `http://` when no scheme is given and strips trailing slashes.
pub fn normalize_endpoint(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

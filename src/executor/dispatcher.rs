use super::protocol::WORKER_ENDPOINT_REQUEST;
use super::types::Job;
use crate::membership::types::WorkerNode;

use anyhow::Result;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Sends job sequences to shard workers.
///
/// A send only hands the sequence over; the worker replies later through the node-data
/// callback.
#[derive(Clone)]
pub struct Dispatcher {
    http_client: reqwest::Client,
    send_timeout: Duration,
    attempts: usize,
}

impl Dispatcher {
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            send_timeout,
            attempts: 3,
        }
    }

    /// `POST {endpoint}/api/request/{qid}` with the raw sequence as body.
    ///
    /// Retried only while the connection cannot be established; a timeout after the
    /// request went out is final, so no worker runs the same job twice.
    pub async fn send(&self, worker: &WorkerNode, job: &Job) -> Result<()> {
        let url = worker.url(&format!("{}/{}", WORKER_ENDPOINT_REQUEST, job.id));
        let response = self.post_with_retry(url, &job.sequence).await?;

        if !response.status().is_success() {
            anyhow::bail!("worker answered {}", response.status());
        }

        tracing::debug!("Job {} handed to {}", job.id, worker.endpoint);
        Ok(())
    }

    // --- HTTP Helpers with Backoff ---

    async fn post_with_retry(&self, url: String, body: &str) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .http_client
                .post(url.clone())
                .header(CONTENT_TYPE, "text/plain")
                .body(body.to_string())
                .timeout(self.send_timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    // A request that may have reached the worker is never resent.
                    if !e.is_connect() || attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    // Simple jitter to prevent thundering herd
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

//! Coordinator configuration.
//!
//! Values come from an optional JSON file; command-line flags override them in `main`.

use crate::membership::types::normalize_endpoint;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Credentials and limits for the bibliographic metadata service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataServiceConfig {
    /// Base URL of the E-utilities endpoints.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Contact address sent with every request.
    pub email: Option<String>,
    /// Tool name sent with every request.
    pub tool: String,
    pub request_timeout_secs: u64,
}

impl Default for MetadataServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            api_key: None,
            email: None,
            tool: "seqsearch-coordinator".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl MetadataServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Address the HTTP surface listens on.
    pub bind: String,
    /// Shard worker endpoints, `host:port` or full URLs.
    pub workers: Vec<String>,
    /// Number of jobs that may be fanned out at once.
    pub max_active_jobs: usize,
    pub cache_dir: PathBuf,
    pub cache_capacity: usize,
    pub probe_timeout_ms: u64,
    pub dispatch_timeout_ms: u64,
    /// Per-job reply deadline; 0 disables it.
    pub reply_timeout_secs: u64,
    pub sweep_interval_ms: u64,
    pub stats_interval_secs: u64,
    pub metadata: MetadataServiceConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            workers: Vec::new(),
            max_active_jobs: 5,
            cache_dir: PathBuf::from("./cache"),
            cache_capacity: 100,
            probe_timeout_ms: 10_000,
            dispatch_timeout_ms: 10_000,
            reply_timeout_secs: 900,
            sweep_interval_ms: 1_000,
            stats_interval_secs: 30,
            metadata: MetadataServiceConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Reads one worker address per line, skipping blanks and `#` comments.
    pub fn load_worker_list(path: &Path) -> Result<Vec<String>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read worker list {}", path.display()))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_active_jobs == 0 {
            anyhow::bail!("max_active_jobs must be at least 1");
        }
        if self.cache_capacity == 0 {
            anyhow::bail!("cache_capacity must be at least 1");
        }
        if self.workers.is_empty() {
            anyhow::bail!("no worker endpoints configured");
        }
        for worker in &self.workers {
            let endpoint = normalize_endpoint(worker);
            let url = reqwest::Url::parse(&endpoint)
                .with_context(|| format!("invalid worker endpoint {:?}", worker))?;
            if url.host_str().is_none() {
                anyhow::bail!("worker endpoint {:?} has no host", worker);
            }
        }
        reqwest::Url::parse(&self.metadata.base_url)
            .with_context(|| format!("invalid metadata base URL {:?}", self.metadata.base_url))?;
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        (self.reply_timeout_secs > 0).then(|| Duration::from_secs(self.reply_timeout_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn with_workers(workers: &[&str]) -> CoordinatorConfig {
        CoordinatorConfig {
            workers: workers.iter().map(|w| w.to_string()).collect(),
            ..CoordinatorConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let cfg = CoordinatorConfig::default();
        assert_eq!(cfg.bind, "0.0.0.0:8080");
        assert_eq!(cfg.max_active_jobs, 5);
        assert_eq!(cfg.cache_capacity, 100);
        assert_eq!(cfg.reply_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(cfg.metadata.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn zero_reply_timeout_disables_deadline() {
        let cfg = CoordinatorConfig {
            reply_timeout_secs: 0,
            ..CoordinatorConfig::default()
        };
        assert!(cfg.reply_timeout().is_none());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        assert!(with_workers(&[]).validate().is_err());
        assert!(with_workers(&["bad host:80"]).validate().is_err());

        let mut cfg = with_workers(&["10.0.0.1:5000"]);
        assert!(cfg.validate().is_ok());
        cfg.max_active_jobs = 0;
        assert!(cfg.validate().is_err());

        let cfg = CoordinatorConfig {
            cache_capacity: 0,
            ..with_workers(&["10.0.0.1:5000"])
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coordinator.json");
        std::fs::write(
            &path,
            r#"{"workers": ["a:1", "b:2"], "max_active_jobs": 2, "metadata": {"email": "me@example.org"}}"#,
        )
        .unwrap();

        let cfg = CoordinatorConfig::from_file(&path).unwrap();

        assert_eq!(cfg.workers, vec!["a:1", "b:2"]);
        assert_eq!(cfg.max_active_jobs, 2);
        assert_eq!(cfg.cache_capacity, 100);
        assert_eq!(cfg.metadata.email.as_deref(), Some("me@example.org"));
        assert_eq!(cfg.metadata.tool, "seqsearch-coordinator");
    }

    #[test]
    fn worker_list_skips_blanks_and_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("workers.txt");
        std::fs::write(&path, "18.220.28.88:5000\n\n# spare\n3.14.15.92:5000\n").unwrap();

        let workers = CoordinatorConfig::load_worker_list(&path).unwrap();

        assert_eq!(workers, vec!["18.220.28.88:5000", "3.14.15.92:5000"]);
    }
}

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use seqsearch_cluster::config::CoordinatorConfig;
use seqsearch_cluster::enrichment::entrez::EntrezClient;
use seqsearch_cluster::executor::coordinator::Coordinator;
use seqsearch_cluster::membership::registry::WorkerRegistry;
use seqsearch_cluster::server::router;
use seqsearch_cluster::storage::cache::ResultCache;

#[derive(Parser, Debug)]
#[command(name = "seqsearch-coordinator")]
#[command(version)]
#[command(about = "Fans sequence searches out to shard workers and serves ranked, annotated results")]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (e.g. 0.0.0.0:8080)
    #[arg(long)]
    bind: Option<String>,

    /// Shard worker endpoint; repeat for each worker
    #[arg(long = "worker")]
    workers: Vec<String>,

    /// File with one worker endpoint per line
    #[arg(long)]
    workers_file: Option<PathBuf>,

    /// Maximum number of jobs fanned out at once
    #[arg(long)]
    max_active_jobs: Option<usize>,

    /// Directory of the result cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Maximum number of cached results
    #[arg(long)]
    cache_capacity: Option<usize>,

    /// Seconds an active job waits for its workers (0 disables the deadline)
    #[arg(long)]
    reply_timeout_secs: Option<u64>,

    /// API key for the metadata service
    #[arg(long, env = "ENTREZ_API_KEY")]
    entrez_api_key: Option<String>,

    /// Contact email for the metadata service
    #[arg(long, env = "ENTREZ_EMAIL")]
    entrez_email: Option<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<CoordinatorConfig> {
        let mut config = match &self.config {
            Some(path) => CoordinatorConfig::from_file(path)?,
            None => CoordinatorConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(path) = &self.workers_file {
            config.workers = CoordinatorConfig::load_worker_list(path)?;
        }
        if !self.workers.is_empty() {
            config.workers.extend(self.workers);
        }
        if let Some(max_active_jobs) = self.max_active_jobs {
            config.max_active_jobs = max_active_jobs;
        }
        if let Some(cache_dir) = self.cache_dir {
            config.cache_dir = cache_dir;
        }
        if let Some(cache_capacity) = self.cache_capacity {
            config.cache_capacity = cache_capacity;
        }
        if let Some(reply_timeout_secs) = self.reply_timeout_secs {
            config.reply_timeout_secs = reply_timeout_secs;
        }
        if self.entrez_api_key.is_some() {
            config.metadata.api_key = self.entrez_api_key;
        }
        if self.entrez_email.is_some() {
            config.metadata.email = self.entrez_email;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;

    tracing::info!("Starting coordinator on {}", config.bind);
    tracing::info!(
        "{} worker(s) configured, {} active slot(s)",
        config.workers.len(),
        config.max_active_jobs
    );

    // 1. Result cache:
    let cache = ResultCache::open(&config.cache_dir, config.cache_capacity).await?;

    // 2. Worker registry and metadata source:
    let registry = WorkerRegistry::new(&config.workers);
    let source = Arc::new(EntrezClient::new(&config.metadata));

    // 3. Coordinator and background tasks:
    let coordinator = Coordinator::new(&config, registry, source, cache);
    match config.reply_timeout() {
        Some(timeout) => {
            tracing::info!("Reply deadline: {}s", timeout.as_secs());
            coordinator.clone().start_deadline_sweeper(config.sweep_interval());
        }
        None => tracing::info!("Reply deadline disabled"),
    }
    coordinator.clone().start_stats_reporter(config.stats_interval());

    // 4. HTTP server:
    let app = router(coordinator);
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;

    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app).await?;

    Ok(())
}

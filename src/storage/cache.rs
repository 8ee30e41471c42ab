use super::types::CacheEntry;
use crate::enrichment::types::EnrichedResult;
use crate::executor::types::{JobId, now_ms};

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

/// Disk-backed result cache bounded to `capacity` entries.
pub struct ResultCache {
    dir: PathBuf,
    capacity: usize,
    index: DashMap<JobId, u64>,
    // Serialises put/evict so the capacity check and the insert happen together.
    write_lock: Mutex<()>,
    last_stamp: AtomicU64,
}

impl ResultCache {
    /// Opens (or creates) the cache directory and rebuilds the index from its files.
    pub async fn open(dir: impl Into<PathBuf>, capacity: usize) -> Result<Arc<Self>> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("cannot create cache directory {}", dir.display()))?;

        let cache = Self {
            dir,
            capacity,
            index: DashMap::new(),
            write_lock: Mutex::new(()),
            last_stamp: AtomicU64::new(0),
        };
        cache.load_index().await?;

        let overflow = cache.index.len().saturating_sub(capacity);
        for _ in 0..overflow {
            cache.evict_oldest().await?;
        }

        tracing::info!(
            "Result cache opened at {} with {} of {} entries",
            cache.dir.display(),
            cache.index.len(),
            capacity
        );
        Ok(Arc::new(cache))
    }

    pub fn has(&self, id: &JobId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn get(&self, id: &JobId) -> Result<Option<CacheEntry>> {
        if !self.has(id) {
            return Ok(None);
        }

        let path = self.entry_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Cache file for {} disappeared, dropping it from the index", id);
                self.index.remove(id);
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read {}", path.display()));
            }
        };

        let entry = serde_json::from_slice(&bytes)
            .with_context(|| format!("corrupt cache entry {}", path.display()))?;
        Ok(Some(entry))
    }

    /// Stores `payload` under `id`, evicting the oldest entry if the cache is full.
    ///
    /// Replacing an existing entry keeps its original creation stamp. Nothing is evicted
    /// unless the new entry has been written out first.
    pub async fn put(&self, id: &JobId, payload: EnrichedResult) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let existing = self.index.get(id).map(|stamp| *stamp);
        let created_at = existing.unwrap_or_else(|| self.next_stamp());

        let entry = CacheEntry {
            id: id.clone(),
            created_at,
            payload,
        };
        let bytes = serde_json::to_vec(&entry).context("cannot encode cache entry")?;

        let path = self.entry_path(id);
        let temp = path.with_extension(TEMP_EXTENSION);
        tokio::fs::write(&temp, &bytes)
            .await
            .with_context(|| format!("cannot write {}", temp.display()))?;

        if existing.is_none() && self.index.len() >= self.capacity {
            self.evict_oldest().await?;
        }
        tokio::fs::rename(&temp, &path)
            .await
            .with_context(|| format!("cannot move {} into place", path.display()))?;

        self.index.insert(id.clone(), created_at);
        tracing::debug!("Cached result {} ({} entries)", id, self.index.len());
        Ok(())
    }

    fn entry_path(&self, id: &JobId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, ENTRY_EXTENSION))
    }

    /// Next creation stamp: wall-clock millis, bumped past the previous stamp on ties.
    fn next_stamp(&self) -> u64 {
        let now = now_ms();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    async fn evict_oldest(&self) -> Result<()> {
        let oldest = self
            .index
            .iter()
            .map(|entry| (*entry.value(), entry.key().clone()))
            .min();

        let Some((_, id)) = oldest else {
            return Ok(());
        };

        let path = self.entry_path(&id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("cannot evict {}", path.display()));
            }
        }

        self.index.remove(&id);
        tracing::debug!("Evicted cached result {}", id);
        Ok(())
    }

    async fn load_index(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("cannot list {}", self.dir.display()))?;

        let mut newest = 0u64;
        while let Some(dir_entry) = entries.next_entry().await? {
            let path = dir_entry.path();

            match path.extension().and_then(|ext| ext.to_str()) {
                Some(ENTRY_EXTENSION) => {}
                Some(TEMP_EXTENSION) => {
                    // Leftover of an interrupted write
                    let _ = tokio::fs::remove_file(&path).await;
                    continue;
                }
                _ => continue,
            }

            match read_entry_header(&path).await {
                Ok((id, created_at)) => {
                    newest = newest.max(created_at);
                    self.index.insert(id, created_at);
                }
                Err(e) => tracing::warn!("Skipping unreadable cache file {}: {:#}", path.display(), e),
            }
        }

        self.last_stamp.store(newest, Ordering::SeqCst);
        Ok(())
    }
}

/// Reads a cache file and checks that its name matches the id it holds.
async fn read_entry_header(path: &Path) -> Result<(JobId, u64)> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("file name is not valid UTF-8")?;
    let expected = JobId::parse(stem)?;

    let bytes = tokio::fs::read(path).await?;
    let entry: CacheEntry = serde_json::from_slice(&bytes)?;

    if entry.id != expected {
        anyhow::bail!("file holds entry {} instead of {}", entry.id, expected);
    }
    Ok((entry.id, entry.created_at))
}

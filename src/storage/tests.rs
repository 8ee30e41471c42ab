//! Result Cache Tests
//!
//! ## Test Scopes
//! - **Bound**: Capacity is never exceeded; the oldest entry goes first, and only once the
//!   new entry is on disk.
//! - **Durability**: Entries survive reopening the directory.
//! - **Overwrite**: Re-putting an id replaces the payload but keeps its age.

#[cfg(test)]
mod tests {
    use crate::enrichment::types::{EnrichedResult, MetadataStatus};
    use crate::executor::types::JobId;
    use crate::search::types::{RankedResult, ShardResult};
    use crate::storage::cache::ResultCache;
    use tempfile::TempDir;

    fn id(n: usize) -> JobId {
        JobId::from_sequence(format!("ACGT{}", n).as_bytes())
    }

    fn payload(qid: &JobId, score: i64) -> EnrichedResult {
        EnrichedResult::unavailable(&RankedResult {
            qid: qid.clone(),
            results: vec![ShardResult {
                accession: "X1".to_string(),
                score,
                coverage_pct: 100.0,
                identity_pct: 100.0,
            }],
        })
    }

    // ============================================================
    // BOUND TESTS
    // ============================================================

    #[tokio::test]
    async fn test_put_beyond_capacity_evicts_oldest() {
        // ARRANGE
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::open(dir.path(), 3).await.unwrap();

        // ACT: capacity + 1 distinct entries
        for n in 0..4 {
            cache.put(&id(n), payload(&id(n), n as i64)).await.unwrap();
        }

        // ASSERT
        assert_eq!(cache.len(), 3);
        assert!(!cache.has(&id(0)), "oldest entry should be evicted");
        for n in 1..4 {
            assert!(cache.has(&id(n)));
        }
        assert!(cache.get(&id(0)).await.unwrap().is_none());
        assert!(!dir.path().join(format!("{}.json", id(0))).exists());
    }

    #[tokio::test]
    async fn test_failed_write_evicts_nothing() {
        // ARRANGE: a full cache, and a directory squatting on the next entry's temp file
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::open(dir.path(), 2).await.unwrap();
        cache.put(&id(1), payload(&id(1), 1)).await.unwrap();
        cache.put(&id(2), payload(&id(2), 2)).await.unwrap();
        std::fs::create_dir(dir.path().join(format!("{}.tmp", id(3)))).unwrap();

        // ACT
        let result = cache.put(&id(3), payload(&id(3), 3)).await;

        // ASSERT
        assert!(result.is_err());
        assert_eq!(cache.len(), 2);
        assert!(cache.has(&id(1)), "oldest entry must survive a failed put");
        assert!(cache.get(&id(1)).await.unwrap().is_some());
        assert!(!cache.has(&id(3)));
    }

    #[tokio::test]
    async fn test_creation_stamps_increase() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::open(dir.path(), 10).await.unwrap();

        cache.put(&id(1), payload(&id(1), 1)).await.unwrap();
        cache.put(&id(2), payload(&id(2), 2)).await.unwrap();

        let first = cache.get(&id(1)).await.unwrap().unwrap();
        let second = cache.get(&id(2)).await.unwrap().unwrap();
        assert!(first.created_at < second.created_at);
    }

    // ============================================================
    // DURABILITY TESTS
    // ============================================================

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = ResultCache::open(dir.path(), 5).await.unwrap();
            cache.put(&id(7), payload(&id(7), 70)).await.unwrap();
        }

        let reopened = ResultCache::open(dir.path(), 5).await.unwrap();

        assert!(reopened.has(&id(7)));
        let entry = reopened.get(&id(7)).await.unwrap().unwrap();
        assert_eq!(entry.id, id(7));
        assert_eq!(entry.payload.results[0].hit.score, 70);
        assert_eq!(entry.payload.metadata_status, MetadataStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_reopen_trims_and_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        {
            let cache = ResultCache::open(dir.path(), 5).await.unwrap();
            for n in 0..4 {
                cache.put(&id(n), payload(&id(n), n as i64)).await.unwrap();
            }
        }
        std::fs::write(dir.path().join("garbage.json"), b"not json").unwrap();
        std::fs::write(dir.path().join(format!("{}.json", id(99))), b"{").unwrap();

        let reopened = ResultCache::open(dir.path(), 2).await.unwrap();

        assert_eq!(reopened.len(), 2);
        assert!(reopened.has(&id(2)));
        assert!(reopened.has(&id(3)));
        assert!(!reopened.has(&id(99)));
    }

    // ============================================================
    // OVERWRITE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_overwrite_keeps_creation_time() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::open(dir.path(), 2).await.unwrap();
        cache.put(&id(1), payload(&id(1), 1)).await.unwrap();
        let original = cache.get(&id(1)).await.unwrap().unwrap().created_at;
        cache.put(&id(2), payload(&id(2), 2)).await.unwrap();

        // ACT: replace the oldest entry
        cache.put(&id(1), payload(&id(1), 100)).await.unwrap();

        // ASSERT: payload replaced, age kept, no eviction
        let replaced = cache.get(&id(1)).await.unwrap().unwrap();
        assert_eq!(replaced.payload.results[0].hit.score, 100);
        assert_eq!(replaced.created_at, original);
        assert_eq!(cache.len(), 2);

        // id(1) is still the oldest, so it goes first
        cache.put(&id(3), payload(&id(3), 3)).await.unwrap();
        assert!(!cache.has(&id(1)));
        assert!(cache.has(&id(2)));
        assert!(cache.has(&id(3)));
    }
}

use super::types::{RankedResult, ShardResult, TOP_K};
use crate::executor::types::JobId;

/// Merges the per-shard result lists of one job into a single ranking.
///
/// Records are concatenated in shard arrival order, sorted by descending score and
/// truncated to [`TOP_K`]. The sort is stable, so equal scores keep arrival order.
pub fn aggregate(buffers: Vec<Vec<ShardResult>>, qid: JobId) -> RankedResult {
    let mut results: Vec<ShardResult> = buffers.into_iter().flatten().collect();

    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(TOP_K);

    RankedResult { qid, results }
}

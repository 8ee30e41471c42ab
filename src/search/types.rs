use crate::executor::types::JobId;
use serde::{Deserialize, Serialize};

/// Number of records kept after merging every shard's partial results.
pub const TOP_K: usize = 10;

/// One shard's opinion about one matching reference record.
///
/// Field names on the wire follow the worker callback format
/// (`{accession, score, per_cov, per_id}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShardResult {
    pub accession: String,
    pub score: i64,
    #[serde(rename = "per_cov")]
    pub coverage_pct: f64,
    #[serde(rename = "per_id")]
    pub identity_pct: f64,
}

impl ShardResult {
    /// Checks the record before it is accepted into a job's buffer.
    pub fn validate(&self) -> Result<(), String> {
        if self.accession.trim().is_empty() {
            return Err("record with empty accession".to_string());
        }
        for (name, value) in [("per_cov", self.coverage_pct), ("per_id", self.identity_pct)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(format!(
                    "{} out of range for {}: {}",
                    name, self.accession, value
                ));
            }
        }
        Ok(())
    }
}

/// Merged, score-ordered top-K list for one query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedResult {
    pub qid: JobId,
    pub results: Vec<ShardResult>,
}

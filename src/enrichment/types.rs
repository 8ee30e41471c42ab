//! Enrichment Data Types
//!
//! Normalised metadata records attached to ranked hits, and the enriched result that is
//! cached and served to polling clients.

use crate::executor::types::JobId;
use crate::search::types::{RankedResult, ShardResult};
use serde::{Deserialize, Serialize};

/// A publication linked to a sequence record.
///
/// Every field is optional: summaries and flat files routinely omit some of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublicationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Personal authors, comma separated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consortium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pubmed_id: Option<String>,
}

impl PublicationMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Metadata about one reference sequence record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organism: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub publications: Vec<PublicationMetadata>,
}

/// How far metadata enrichment got for a cached result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStatus {
    /// Ranked result persisted, enrichment not finished yet.
    Pending,
    /// Enrichment ran; every record carries a (possibly empty) metadata object.
    Attached,
    /// Enrichment failed; records are served without metadata.
    Unavailable,
}

/// A ranked hit plus whatever metadata was found for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub hit: ShardResult,
    /// `None` when enrichment did not run or failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RecordMetadata>,
}

/// Final answer for a query, as cached and served by poll.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedResult {
    pub qid: JobId,
    pub results: Vec<EnrichedRecord>,
    pub metadata_status: MetadataStatus,
}

impl EnrichedResult {
    /// The ranked result before enrichment ran.
    pub fn pending(ranked: &RankedResult) -> Self {
        Self::bare(ranked, MetadataStatus::Pending)
    }

    /// The ranked result after enrichment failed.
    pub fn unavailable(ranked: &RankedResult) -> Self {
        Self::bare(ranked, MetadataStatus::Unavailable)
    }

    fn bare(ranked: &RankedResult, metadata_status: MetadataStatus) -> Self {
        Self {
            qid: ranked.qid.clone(),
            results: ranked
                .results
                .iter()
                .map(|hit| EnrichedRecord {
                    hit: hit.clone(),
                    data: None,
                })
                .collect(),
            metadata_status,
        }
    }

    pub fn is_final(&self) -> bool {
        self.metadata_status != MetadataStatus::Pending
    }

    /// Recovers the ranking this result was built from.
    pub fn ranked(&self) -> RankedResult {
        RankedResult {
            qid: self.qid.clone(),
            results: self.results.iter().map(|r| r.hit.clone()).collect(),
        }
    }
}

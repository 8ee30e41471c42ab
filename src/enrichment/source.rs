use super::types::RecordMetadata;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Compact summary of a sequence record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSummary {
    /// Versioned accession, e.g. `NC_045512.2`.
    pub accession_version: String,
    /// Locus name.
    pub caption: Option<String>,
    pub title: Option<String>,
    pub organism: Option<String>,
    pub length: Option<u64>,
}

/// Compact summary of a bibliographic record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicationSummary {
    pub id: String,
    pub title: Option<String>,
    /// Author names in list order. A trailing consortium name may be mixed in.
    pub authors: Vec<String>,
    pub last_author: Option<String>,
    pub journal: Option<String>,
    pub pub_date: Option<String>,
    pub doi: Option<String>,
    pub reference_count: Option<u32>,
}

/// The external bibliographic service used to enrich ranked hits.
///
/// All calls are batched: one request covers every identifier passed in.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// For each accession (in input order), the ids of linked publications.
    async fn linked_publications(&self, accessions: &[String]) -> Result<Vec<Vec<String>>>;

    async fn record_summaries(&self, accessions: &[String]) -> Result<Vec<RecordSummary>>;

    async fn publication_summaries(&self, ids: &[String]) -> Result<Vec<PublicationSummary>>;

    /// Full flat-file text of the given records, concatenated.
    async fn full_records(&self, accessions: &[String]) -> Result<String>;
}

/// Field extraction for full-text records returned by [`MetadataSource::full_records`].
pub trait FlatFileParser: Send + Sync {
    /// Maps each requested accession to whatever could be extracted for it.
    fn parse(&self, text: &str, accessions: &[String]) -> HashMap<String, RecordMetadata>;
}

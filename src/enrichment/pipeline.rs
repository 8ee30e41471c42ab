use super::genbank::GenBankParser;
use super::source::{FlatFileParser, MetadataSource};
use super::summary::{normalize_publication, normalize_record, record_link};
use super::types::{EnrichedRecord, EnrichedResult, MetadataStatus, RecordMetadata};
use crate::search::types::RankedResult;

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Attaches bibliographic metadata to a ranked result.
///
/// Accessions with linked publications take the summary path; the rest fall back to
/// full-text retrieval. Both paths run concurrently.
#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn MetadataSource>,
    parser: Arc<dyn FlatFileParser>,
}

impl Enricher {
    pub fn new(source: Arc<dyn MetadataSource>, parser: Arc<dyn FlatFileParser>) -> Self {
        Self { source, parser }
    }

    /// Enricher that parses full-text records as GenBank flat files.
    pub fn with_genbank(source: Arc<dyn MetadataSource>) -> Self {
        Self::new(source, Arc::new(GenBankParser))
    }

    /// Any source error aborts the whole enrichment; callers keep the ranked result.
    pub async fn enrich(&self, ranked: &RankedResult) -> Result<EnrichedResult> {
        let accessions = unique_accessions(ranked);

        let mut metadata = HashMap::new();
        if !accessions.is_empty() {
            let links = self.source.linked_publications(&accessions).await?;

            let mut linked = Vec::new();
            let mut unlinked = Vec::new();
            let links = links.into_iter().chain(std::iter::repeat_with(Vec::new));
            for (accession, publication_ids) in accessions.into_iter().zip(links) {
                if publication_ids.is_empty() {
                    unlinked.push(accession);
                } else {
                    linked.push((accession, publication_ids));
                }
            }

            tracing::debug!(
                "Enriching {}: {} via summaries, {} via full text",
                ranked.qid,
                linked.len(),
                unlinked.len()
            );

            let (from_summaries, from_full_text) = tokio::try_join!(
                self.summary_phase(&linked),
                self.full_text_phase(&unlinked)
            )?;
            metadata.extend(from_summaries);
            metadata.extend(from_full_text);
        }

        let results = ranked
            .results
            .iter()
            .map(|hit| EnrichedRecord {
                hit: hit.clone(),
                data: Some(metadata.get(&hit.accession).cloned().unwrap_or_default()),
            })
            .collect();

        Ok(EnrichedResult {
            qid: ranked.qid.clone(),
            results,
            metadata_status: MetadataStatus::Attached,
        })
    }

    async fn summary_phase(
        &self,
        linked: &[(String, Vec<String>)],
    ) -> Result<HashMap<String, RecordMetadata>> {
        if linked.is_empty() {
            return Ok(HashMap::new());
        }

        let accessions: Vec<String> = linked.iter().map(|(acc, _)| acc.clone()).collect();
        let mut seen = HashSet::new();
        let publication_ids: Vec<String> = linked
            .iter()
            .flat_map(|(_, ids)| ids.iter())
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let (publications, records) = tokio::try_join!(
            self.source.publication_summaries(&publication_ids),
            self.source.record_summaries(&accessions)
        )?;

        Ok(linked
            .iter()
            .map(|(accession, ids)| {
                let mut metadata =
                    normalize_record(accession, &records).unwrap_or_else(|| RecordMetadata {
                        link: Some(record_link(accession)),
                        ..RecordMetadata::default()
                    });
                metadata.publications = ids
                    .iter()
                    .filter_map(|id| publications.iter().find(|p| &p.id == id))
                    .map(normalize_publication)
                    .collect();
                (accession.clone(), metadata)
            })
            .collect())
    }

    async fn full_text_phase(&self, unlinked: &[String]) -> Result<HashMap<String, RecordMetadata>> {
        if unlinked.is_empty() {
            return Ok(HashMap::new());
        }
        let text = self.source.full_records(unlinked).await?;
        Ok(self.parser.parse(&text, unlinked))
    }
}

/// Accessions of the ranked hits, first occurrence order.
fn unique_accessions(ranked: &RankedResult) -> Vec<String> {
    let mut seen = HashSet::new();
    ranked
        .results
        .iter()
        .filter(|hit| seen.insert(hit.accession.as_str()))
        .map(|hit| hit.accession.clone())
        .collect()
}

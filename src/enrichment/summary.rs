//! Normalisation of compact summaries into metadata records.

use super::source::{PublicationSummary, RecordSummary};
use super::types::{PublicationMetadata, RecordMetadata};

const PUBMED_LINK_BASE: &str = "https://pubmed.ncbi.nlm.nih.gov";
const NUCCORE_LINK_BASE: &str = "https://www.ncbi.nlm.nih.gov/nuccore";

/// Accession without its `.N` version suffix.
pub fn accession_base(accession: &str) -> &str {
    accession.split('.').next().unwrap_or(accession)
}

pub fn publication_link(id: &str) -> String {
    format!("{}/{}/", PUBMED_LINK_BASE, id)
}

pub fn record_link(accession: &str) -> String {
    format!("{}/{}/", NUCCORE_LINK_BASE, accession)
}

/// Moves the leading year of a `YYYY Mon DD` date to the end: `2020 Jan 5` -> `Jan 5 2020`.
pub fn reorder_pub_date(date: &str) -> String {
    let mut parts: Vec<&str> = date.split_whitespace().collect();
    if parts.len() > 1 {
        parts.rotate_left(1);
    }
    parts.join(" ")
}

/// Splits an author list into personal authors and an optional consortium.
///
/// Summaries list a consortium as the final author. When the final entry differs from
/// the separate last-author field it is treated as the consortium.
pub fn split_authors(
    authors: &[String],
    last_author: Option<&str>,
) -> (Option<String>, Option<String>) {
    let Some((last, rest)) = authors.split_last() else {
        return (None, None);
    };

    if last_author == Some(last.as_str()) {
        return (Some(authors.join(", ")), None);
    }

    let personal = if rest.is_empty() {
        None
    } else {
        Some(rest.join(", "))
    };
    (personal, Some(last.clone()))
}

pub fn normalize_publication(summary: &PublicationSummary) -> PublicationMetadata {
    let (authors, consortium) = split_authors(&summary.authors, summary.last_author.as_deref());

    PublicationMetadata {
        title: non_empty(summary.title.as_deref()),
        authors,
        consortium,
        journal: non_empty(summary.journal.as_deref()),
        date_published: non_empty(summary.pub_date.as_deref()).map(|d| reorder_pub_date(&d)),
        doi: non_empty(summary.doi.as_deref()),
        reference_count: summary.reference_count,
        link: Some(publication_link(&summary.id)),
        pubmed_id: Some(summary.id.clone()),
    }
}

/// Builds the record metadata for `accession` from the summary that matches it, if any.
///
/// Summaries are matched by version-less accession, since the ranked hit and the service
/// may disagree on the version.
pub fn normalize_record(accession: &str, summaries: &[RecordSummary]) -> Option<RecordMetadata> {
    let base = accession_base(accession);
    let summary = summaries
        .iter()
        .find(|s| accession_base(&s.accession_version) == base)?;

    Some(RecordMetadata {
        definition: non_empty(summary.title.as_deref()),
        locus: non_empty(summary.caption.as_deref()),
        organism: non_empty(summary.organism.as_deref()),
        length: summary.length,
        link: Some(record_link(accession)),
        publications: Vec::new(),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

//! GenBank flat-file field extraction.
//!
//! A record is a run of keyword lines (keyword in the first columns, value from column 13)
//! with 12-space continuation lines, terminated by a `//` line. Only the header section is
//! read: parsing stops at `FEATURES` or `ORIGIN`.

use super::source::FlatFileParser;
use super::summary::{accession_base, publication_link, record_link};
use super::types::{PublicationMetadata, RecordMetadata};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static KEYWORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^( {0,5})([A-Z][A-Z_]+)(?:\s+(.*))?$").expect("keyword line pattern is valid")
});

static CONTINUATION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {6,}(\S.*)$").expect("continuation pattern is valid"));

const RECORD_TERMINATOR: &str = "//";

/// One keyword line with its continuations folded in.
#[derive(Debug)]
struct Field {
    indent: usize,
    keyword: String,
    value: String,
}

/// Header of a single flat-file record.
#[derive(Debug, Default)]
struct GenBankRecord {
    fields: Vec<Field>,
}

impl GenBankRecord {
    fn parse(text: &str) -> Self {
        let mut fields: Vec<Field> = Vec::new();

        for line in text.lines() {
            if let Some(caps) = KEYWORD_LINE.captures(line) {
                let keyword = caps[2].to_string();
                if keyword == "FEATURES" || keyword == "ORIGIN" {
                    break;
                }
                fields.push(Field {
                    indent: caps[1].len(),
                    keyword,
                    value: caps.get(3).map_or("", |m| m.as_str()).trim().to_string(),
                });
            } else if let Some(caps) = CONTINUATION_LINE.captures(line) {
                if let Some(field) = fields.last_mut() {
                    if !field.value.is_empty() {
                        field.value.push(' ');
                    }
                    field.value.push_str(caps[1].trim_end());
                }
            }
        }

        Self { fields }
    }

    fn top_level(&self, keyword: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.indent == 0 && f.keyword == keyword)
            .map(|f| f.value.as_str())
            .filter(|v| !v.is_empty())
    }

    fn accession(&self) -> Option<&str> {
        self.top_level("ACCESSION")
            .and_then(|v| v.split_whitespace().next())
    }

    fn locus_name(&self) -> Option<&str> {
        self.top_level("LOCUS").and_then(|v| v.split_whitespace().next())
    }

    /// Sequence length from the LOCUS line (`<n> bp` or `<n> aa`).
    fn length(&self) -> Option<u64> {
        let tokens: Vec<&str> = self.top_level("LOCUS")?.split_whitespace().collect();
        tokens
            .windows(2)
            .find(|w| w[1] == "bp" || w[1] == "aa")
            .and_then(|w| w[0].parse().ok())
    }

    /// Sub-fields of the first REFERENCE block.
    fn first_reference(&self) -> Option<PublicationMetadata> {
        let start = self
            .fields
            .iter()
            .position(|f| f.indent == 0 && f.keyword == "REFERENCE")?;

        let mut publication = PublicationMetadata::default();
        for field in self.fields[start + 1..].iter().take_while(|f| f.indent > 0) {
            let value = Some(field.value.clone()).filter(|v| !v.is_empty());
            match field.keyword.as_str() {
                "AUTHORS" => publication.authors = value,
                "CONSRTM" => publication.consortium = value,
                "TITLE" => publication.title = value,
                "JOURNAL" => publication.journal = value,
                "PUBMED" => {
                    publication.link = value.as_deref().map(publication_link);
                    publication.pubmed_id = value;
                }
                _ => {}
            }
        }

        (!publication.is_empty()).then_some(publication)
    }

    fn to_metadata(&self, accession: &str) -> RecordMetadata {
        RecordMetadata {
            definition: self.top_level("DEFINITION").map(str::to_string),
            locus: self.locus_name().map(str::to_string),
            organism: self.top_level("SOURCE").map(str::to_string),
            length: self.length(),
            link: Some(record_link(accession)),
            publications: self.first_reference().into_iter().collect(),
        }
    }
}

/// Splits concatenated flat-file text into record bodies.
fn split_records(text: &str) -> Vec<&str> {
    let mut records = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == RECORD_TERMINATOR {
            records.push(&text[start..offset - line.len()]);
            start = offset;
        }
    }
    if !text[start..].trim().is_empty() {
        records.push(&text[start..]);
    }

    records
        .into_iter()
        .filter(|r| !r.trim().is_empty())
        .collect()
}

/// [`FlatFileParser`] for the GenBank text format.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenBankParser;

impl FlatFileParser for GenBankParser {
    fn parse(&self, text: &str, accessions: &[String]) -> HashMap<String, RecordMetadata> {
        let records: Vec<GenBankRecord> = split_records(text)
            .into_iter()
            .map(GenBankRecord::parse)
            .collect();

        let mut parsed = HashMap::new();
        for (i, accession) in accessions.iter().enumerate() {
            let base = accession_base(accession);
            let by_accession = records
                .iter()
                .find(|r| r.accession().map(accession_base) == Some(base));

            // Records without an ACCESSION line are matched by response order.
            let record = by_accession.or_else(|| {
                records
                    .get(i)
                    .filter(|r| r.accession().is_none())
            });

            match record {
                Some(record) => {
                    parsed.insert(accession.clone(), record.to_metadata(accession));
                }
                None => tracing::debug!("No flat-file record found for {}", accession),
            }
        }

        parsed
    }
}

//! Metadata Enrichment Tests
//!
//! ## Test Scopes
//! - **Normalisation**: Author/consortium split, date reordering, accession matching.
//! - **Flat-file parsing**: GenBank header extraction and record matching.
//! - **Service responses**: Decoding of link sets and summary documents.
//! - **Pipeline**: Partitioning, ordering, empty metadata and error propagation.

#[cfg(test)]
mod tests {
    use crate::enrichment::entrez::{link_lists, publications_from, records_from};
    use crate::enrichment::genbank::GenBankParser;
    use crate::enrichment::pipeline::Enricher;
    use crate::enrichment::protocol::{ELinkResponse, ESummaryResponse, NuccoreDoc, PubmedDoc};
    use crate::enrichment::source::{
        FlatFileParser, MetadataSource, PublicationSummary, RecordSummary,
    };
    use crate::enrichment::summary::{
        normalize_publication, normalize_record, reorder_pub_date, split_authors,
    };
    use crate::enrichment::types::{EnrichedResult, MetadataStatus, RecordMetadata};
    use crate::executor::types::JobId;
    use crate::search::types::{RankedResult, ShardResult};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    const SAMPLE_GENBANK: &str = r#"LOCUS       MN908947               29903 bp    RNA     linear   VRL 18-MAR-2020
DEFINITION  Severe acute respiratory syndrome coronavirus 2 isolate Wuhan-Hu-1,
            complete genome.
ACCESSION   MN908947
VERSION     MN908947.3
KEYWORDS    .
SOURCE      Severe acute respiratory syndrome coronavirus 2 (SARS-CoV-2)
  ORGANISM  Severe acute respiratory syndrome coronavirus 2
            Viruses; Riboviria.
REFERENCE   1  (bases 1 to 29903)
  AUTHORS   Wu,F., Zhao,S., Yu,B.
  CONSRTM   Example Sequencing Consortium
  TITLE     A new coronavirus associated with human respiratory disease in
            China
  JOURNAL   Nature 579 (7798), 265-269 (2020)
   PUBMED   32015508
REFERENCE   2  (bases 1 to 29903)
  AUTHORS   Other,A.
  TITLE     Direct Submission
FEATURES             Location/Qualifiers
     source          1..29903
                     /organism="Severe acute respiratory syndrome coronavirus 2"
ORIGIN
        1 attaaaggtt tataccttcc caggtaacaa accaaccaac tttcgatctc ttgtagatct
//
LOCUS       OTHER1                   120 bp    DNA     linear   BCT 01-JAN-2021
DEFINITION  Unrelated bacterial fragment.
ACCESSION   OTHER1
SOURCE      Escherichia coli
//
"#;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn hit(accession: &str, score: i64) -> ShardResult {
        ShardResult {
            accession: accession.to_string(),
            score,
            coverage_pct: 98.0,
            identity_pct: 97.5,
        }
    }

    fn ranked(hits: Vec<ShardResult>) -> RankedResult {
        RankedResult {
            qid: JobId::from_sequence(b"ACGTACGT"),
            results: hits,
        }
    }

    /// In-memory metadata service.
    #[derive(Default)]
    struct FakeSource {
        links: HashMap<String, Vec<String>>,
        records: Vec<RecordSummary>,
        publications: Vec<PublicationSummary>,
        full_text: String,
        fail_summaries: bool,
        link_calls: Mutex<Vec<Vec<String>>>,
        full_text_calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl MetadataSource for FakeSource {
        async fn linked_publications(&self, accessions: &[String]) -> anyhow::Result<Vec<Vec<String>>> {
            self.link_calls.lock().push(accessions.to_vec());
            Ok(accessions
                .iter()
                .map(|acc| self.links.get(acc).cloned().unwrap_or_default())
                .collect())
        }

        async fn record_summaries(&self, _accessions: &[String]) -> anyhow::Result<Vec<RecordSummary>> {
            if self.fail_summaries {
                anyhow::bail!("summary service unavailable");
            }
            Ok(self.records.clone())
        }

        async fn publication_summaries(&self, _ids: &[String]) -> anyhow::Result<Vec<PublicationSummary>> {
            Ok(self.publications.clone())
        }

        async fn full_records(&self, accessions: &[String]) -> anyhow::Result<String> {
            self.full_text_calls.lock().push(accessions.to_vec());
            Ok(self.full_text.clone())
        }
    }

    // ============================================================
    // NORMALISATION TESTS
    // ============================================================

    #[test]
    fn test_split_authors_detects_consortium() {
        let authors = strings(&["Wu F", "Zhao S", "Example Consortium"]);

        let (personal, consortium) = split_authors(&authors, Some("Zhao S"));

        assert_eq!(personal.as_deref(), Some("Wu F, Zhao S"));
        assert_eq!(consortium.as_deref(), Some("Example Consortium"));
    }

    #[test]
    fn test_split_authors_without_consortium() {
        let authors = strings(&["Wu F", "Zhao S"]);

        let (personal, consortium) = split_authors(&authors, Some("Zhao S"));

        assert_eq!(personal.as_deref(), Some("Wu F, Zhao S"));
        assert!(consortium.is_none());
        assert_eq!(split_authors(&[], Some("Zhao S")), (None, None));
    }

    #[test]
    fn test_reorder_pub_date() {
        assert_eq!(reorder_pub_date("2020 Jan 5"), "Jan 5 2020");
        assert_eq!(reorder_pub_date("2021 Mar"), "Mar 2021");
        assert_eq!(reorder_pub_date("2019"), "2019");
    }

    #[test]
    fn test_normalize_publication_fields() {
        let summary = PublicationSummary {
            id: "32015508".to_string(),
            title: Some("A new coronavirus".to_string()),
            authors: strings(&["Wu F", "Zhao S"]),
            last_author: Some("Zhao S".to_string()),
            journal: Some("Nature".to_string()),
            pub_date: Some("2020 Mar".to_string()),
            doi: Some("10.1038/s41586-020-2008-3".to_string()),
            reference_count: Some(42),
        };

        let publication = normalize_publication(&summary);

        assert_eq!(publication.date_published.as_deref(), Some("Mar 2020"));
        assert_eq!(
            publication.link.as_deref(),
            Some("https://pubmed.ncbi.nlm.nih.gov/32015508/")
        );
        assert_eq!(publication.pubmed_id.as_deref(), Some("32015508"));
        assert_eq!(publication.reference_count, Some(42));
        assert!(publication.consortium.is_none());
    }

    #[test]
    fn test_normalize_record_matches_without_version() {
        let summaries = vec![RecordSummary {
            accession_version: "MN908947.3".to_string(),
            caption: Some("MN908947".to_string()),
            title: Some("SARS-CoV-2 isolate Wuhan-Hu-1".to_string()),
            organism: Some("SARS-CoV-2".to_string()),
            length: Some(29903),
        }];

        let metadata = normalize_record("MN908947.1", &summaries).unwrap();

        assert_eq!(metadata.locus.as_deref(), Some("MN908947"));
        assert_eq!(metadata.length, Some(29903));
        assert_eq!(
            metadata.link.as_deref(),
            Some("https://www.ncbi.nlm.nih.gov/nuccore/MN908947.1/")
        );
        assert!(normalize_record("NC_000001", &summaries).is_none());
    }

    // ============================================================
    // FLAT-FILE PARSING TESTS
    // ============================================================

    #[test]
    fn test_genbank_extracts_header_fields() {
        let parsed = GenBankParser.parse(SAMPLE_GENBANK, &strings(&["MN908947.3"]));

        let record = &parsed["MN908947.3"];
        assert_eq!(record.locus.as_deref(), Some("MN908947"));
        assert_eq!(
            record.definition.as_deref(),
            Some("Severe acute respiratory syndrome coronavirus 2 isolate Wuhan-Hu-1, complete genome.")
        );
        assert_eq!(
            record.organism.as_deref(),
            Some("Severe acute respiratory syndrome coronavirus 2 (SARS-CoV-2)")
        );
        assert_eq!(record.length, Some(29903));

        // Only the first reference is taken
        assert_eq!(record.publications.len(), 1);
        let publication = &record.publications[0];
        assert_eq!(publication.authors.as_deref(), Some("Wu,F., Zhao,S., Yu,B."));
        assert_eq!(publication.consortium.as_deref(), Some("Example Sequencing Consortium"));
        assert_eq!(
            publication.title.as_deref(),
            Some("A new coronavirus associated with human respiratory disease in China")
        );
        assert_eq!(publication.journal.as_deref(), Some("Nature 579 (7798), 265-269 (2020)"));
        assert_eq!(publication.pubmed_id.as_deref(), Some("32015508"));
    }

    #[test]
    fn test_genbank_matches_records_by_accession() {
        // Requested in the opposite order of the response
        let parsed = GenBankParser.parse(SAMPLE_GENBANK, &strings(&["OTHER1", "MN908947"]));

        assert_eq!(parsed["OTHER1"].organism.as_deref(), Some("Escherichia coli"));
        assert_eq!(parsed["OTHER1"].length, Some(120));
        assert!(parsed["OTHER1"].publications.is_empty());
        assert_eq!(parsed["MN908947"].locus.as_deref(), Some("MN908947"));
    }

    #[test]
    fn test_genbank_skips_missing_records() {
        let parsed = GenBankParser.parse(SAMPLE_GENBANK, &strings(&["NOPE1"]));
        assert!(parsed.is_empty());

        let parsed = GenBankParser.parse("", &strings(&["MN908947"]));
        assert!(parsed.is_empty());
    }

    // ============================================================
    // SERVICE RESPONSE TESTS
    // ============================================================

    #[test]
    fn test_parse_link_sets_pads_missing_sets() {
        let body = json!({
            "linksets": [
                { "dbfrom": "nuccore", "linksetdbs": [
                    { "dbto": "pubmed", "linkname": "nuccore_pubmed", "links": ["32015508", 31978945] }
                ]},
                { "dbfrom": "nuccore" }
            ]
        });

        let body: ELinkResponse = serde_json::from_value(body).unwrap();
        let linked = link_lists(body, 3);

        assert_eq!(linked.len(), 3);
        assert_eq!(linked[0], strings(&["32015508", "31978945"]));
        assert!(linked[1].is_empty());
        assert!(linked[2].is_empty());
    }

    #[test]
    fn test_parse_link_sets_rejects_malformed_body() {
        let body = serde_json::from_value::<ELinkResponse>(json!({ "error": "bad request" }));
        assert!(body.is_err());
    }

    #[test]
    fn test_parse_summaries() {
        let records = json!({
            "result": {
                "uids": ["1798174254"],
                "1798174254": {
                    "caption": "MN908947",
                    "title": "SARS-CoV-2 isolate Wuhan-Hu-1, complete genome",
                    "accessionversion": "MN908947.3",
                    "slen": 29903,
                    "organism": "Severe acute respiratory syndrome coronavirus 2"
                }
            }
        });
        let publications = json!({
            "result": {
                "uids": ["32015508"],
                "32015508": {
                    "title": "A pneumonia outbreak",
                    "authors": [{ "name": "Zhou P" }, { "name": "Shi ZL" }],
                    "lastauthor": "Shi ZL",
                    "fulljournalname": "Nature",
                    "pubdate": "2020 Mar",
                    "pmcrefcount": "1200",
                    "articleids": [
                        { "idtype": "pubmed", "value": "32015508" },
                        { "idtype": "doi", "value": "10.1038/s41586-020-2012-7" }
                    ]
                }
            }
        });

        let records: ESummaryResponse<NuccoreDoc> = serde_json::from_value(records).unwrap();
        let publications: ESummaryResponse<PubmedDoc> = serde_json::from_value(publications).unwrap();
        let records = records_from(records);
        let publications = publications_from(publications);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].accession_version, "MN908947.3");
        assert_eq!(records[0].length, Some(29903));

        assert_eq!(publications.len(), 1);
        assert_eq!(publications[0].id, "32015508");
        assert_eq!(publications[0].authors, strings(&["Zhou P", "Shi ZL"]));
        assert_eq!(publications[0].doi.as_deref(), Some("10.1038/s41586-020-2012-7"));
        assert_eq!(publications[0].reference_count, Some(1200));
    }

    #[test]
    fn test_summaries_skip_unresolved_uids_and_keep_order() {
        let body = json!({
            "header": { "type": "esummary" },
            "result": {
                "uids": ["2", "404", "1"],
                "1": { "accessionversion": "AB000001.1", "slen": "", "title": "  " },
                "2": { "accessionversion": "AB000002.1", "slen": "1500" },
                "404": { "uid": "404", "error": "cannot get document summary" }
            }
        });

        let body: ESummaryResponse<NuccoreDoc> = serde_json::from_value(body).unwrap();
        let records = records_from(body);

        let accessions: Vec<&str> = records.iter().map(|r| r.accession_version.as_str()).collect();
        assert_eq!(accessions, vec!["AB000002.1", "AB000001.1"]);
        assert_eq!(records[0].length, Some(1500));
        assert_eq!(records[1].length, None);
        assert_eq!(records[1].title, None);
    }

    #[test]
    fn test_summary_body_without_result_rejected() {
        let body = serde_json::from_value::<ESummaryResponse<PubmedDoc>>(json!({ "esearchresult": {} }));
        assert!(body.is_err());
    }

    // ============================================================
    // TYPE TESTS
    // ============================================================

    #[test]
    fn test_unenriched_result_wire_format() {
        let result = EnrichedResult::unavailable(&ranked(vec![hit("X1", 80)]));

        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["metadata_status"], "unavailable");
        assert_eq!(value["results"][0]["accession"], "X1");
        assert_eq!(value["results"][0]["per_cov"], 98.0);
        assert!(value["results"][0].get("data").is_none());
        assert!(result.is_final());
        assert!(!EnrichedResult::pending(&result.ranked()).is_final());
    }

    // ============================================================
    // PIPELINE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_enrich_partitions_and_keeps_order() {
        // ARRANGE: X1 has a linked publication, MN908947 and Z3 do not
        let source = Arc::new(FakeSource {
            links: HashMap::from([("X1".to_string(), strings(&["111"]))]),
            records: vec![RecordSummary {
                accession_version: "X1.2".to_string(),
                caption: Some("X1".to_string()),
                title: Some("Linked record".to_string()),
                organism: None,
                length: Some(500),
            }],
            publications: vec![PublicationSummary {
                id: "111".to_string(),
                title: Some("Linked paper".to_string()),
                authors: strings(&["Doe J", "Some Consortium"]),
                last_author: Some("Doe J".to_string()),
                ..PublicationSummary::default()
            }],
            full_text: SAMPLE_GENBANK.to_string(),
            ..FakeSource::default()
        });
        let enricher = Enricher::with_genbank(source.clone());
        let input = ranked(vec![hit("X1", 90), hit("MN908947", 80), hit("X1", 70), hit("Z3", 60)]);

        // ACT
        let enriched = enricher.enrich(&input).await.unwrap();

        // ASSERT: ordering and count untouched
        assert_eq!(enriched.metadata_status, MetadataStatus::Attached);
        let order: Vec<&str> = enriched.results.iter().map(|r| r.hit.accession.as_str()).collect();
        assert_eq!(order, vec!["X1", "MN908947", "X1", "Z3"]);

        // Summary path
        let linked = enriched.results[0].data.as_ref().unwrap();
        assert_eq!(linked.definition.as_deref(), Some("Linked record"));
        assert_eq!(linked.publications[0].consortium.as_deref(), Some("Some Consortium"));
        assert_eq!(enriched.results[2].data, enriched.results[0].data);

        // Full-text path
        let parsed = enriched.results[1].data.as_ref().unwrap();
        assert_eq!(parsed.locus.as_deref(), Some("MN908947"));

        // Nothing found: empty metadata, still present
        assert_eq!(enriched.results[3].data, Some(RecordMetadata::default()));

        // Lookups were batched over unique accessions
        assert_eq!(*source.link_calls.lock(), vec![strings(&["X1", "MN908947", "Z3"])]);
        assert_eq!(*source.full_text_calls.lock(), vec![strings(&["MN908947", "Z3"])]);
    }

    #[tokio::test]
    async fn test_enrich_without_full_text_candidates_skips_retrieval() {
        let source = Arc::new(FakeSource {
            links: HashMap::from([("X1".to_string(), strings(&["111"]))]),
            ..FakeSource::default()
        });
        let enricher = Enricher::with_genbank(source.clone());

        let enriched = enricher.enrich(&ranked(vec![hit("X1", 10)])).await.unwrap();

        assert!(source.full_text_calls.lock().is_empty());
        // No summary matched: the record still gets its link
        let data = enriched.results[0].data.as_ref().unwrap();
        assert_eq!(data.link.as_deref(), Some("https://www.ncbi.nlm.nih.gov/nuccore/X1/"));
    }

    #[tokio::test]
    async fn test_enrich_empty_result() {
        let source = Arc::new(FakeSource::default());
        let enricher = Enricher::with_genbank(source.clone());

        let enriched = enricher.enrich(&ranked(Vec::new())).await.unwrap();

        assert!(enriched.results.is_empty());
        assert!(source.link_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_propagates_source_errors() {
        let source = Arc::new(FakeSource {
            links: HashMap::from([("X1".to_string(), strings(&["111"]))]),
            fail_summaries: true,
            ..FakeSource::default()
        });
        let enricher = Enricher::with_genbank(source);

        let outcome = enricher.enrich(&ranked(vec![hit("X1", 10)])).await;

        assert!(outcome.is_err());
    }
}

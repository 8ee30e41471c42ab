use super::protocol::{ELinkResponse, ESummaryResponse, NuccoreDoc, PubmedDoc};
use super::source::{MetadataSource, PublicationSummary, RecordSummary};
use crate::config::MetadataServiceConfig;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

const DB_NUCCORE: &str = "nuccore";
const DB_PUBMED: &str = "pubmed";
const LINK_NUCCORE_PUBMED: &str = "nuccore_pubmed";

/// [`MetadataSource`] backed by the NCBI E-utilities HTTP API.
pub struct EntrezClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    email: Option<String>,
    tool: String,
    timeout: Duration,
    attempts: usize,
}

impl EntrezClient {
    pub fn new(config: &MetadataServiceConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            email: config.email.clone(),
            tool: config.tool.clone(),
            timeout: config.request_timeout(),
            attempts: 3,
        }
    }

    fn url(&self, utility: &str) -> String {
        format!("{}/{}.fcgi", self.base_url, utility)
    }

    /// Query parameters every call carries.
    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tool", self.tool.clone())];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(email) = &self.email {
            params.push(("email", email.clone()));
        }
        params
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        utility: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<T> {
        let response = self.get_with_retry(utility, params).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("{} returned an unexpected body", utility))
    }

    async fn esummary<D: DeserializeOwned>(
        &self,
        db: &str,
        ids: &[String],
    ) -> Result<ESummaryResponse<D>> {
        let mut params = self.common_params();
        params.push(("db", db.to_string()));
        params.push(("id", ids.join(",")));
        params.push(("retmode", "json".to_string()));
        self.fetch_json("esummary", params).await
    }

    // --- HTTP Helpers with Backoff ---

    async fn get_with_retry(
        &self,
        utility: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<reqwest::Response> {
        let url = self.url(utility);
        let mut delay_ms = 150u64;

        for attempt in 0..self.attempts {
            let response = self
                .http_client
                .get(&url)
                .query(&params)
                .timeout(self.timeout)
                .send()
                .await
                .and_then(|resp| resp.error_for_status());

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == self.attempts {
                        return Err(anyhow::anyhow!(e).context(format!("{} request failed", utility)));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

#[async_trait]
impl MetadataSource for EntrezClient {
    async fn linked_publications(&self, accessions: &[String]) -> Result<Vec<Vec<String>>> {
        if accessions.is_empty() {
            return Ok(Vec::new());
        }

        let mut params = self.common_params();
        params.push(("dbfrom", DB_NUCCORE.to_string()));
        params.push(("db", DB_PUBMED.to_string()));
        params.push(("linkname", LINK_NUCCORE_PUBMED.to_string()));
        params.push(("retmode", "json".to_string()));
        // One `id` parameter per accession keeps one link set per input.
        params.extend(accessions.iter().map(|acc| ("id", acc.clone())));

        let body: ELinkResponse = self.fetch_json("elink", params).await?;
        Ok(link_lists(body, accessions.len()))
    }

    async fn record_summaries(&self, accessions: &[String]) -> Result<Vec<RecordSummary>> {
        if accessions.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.esummary::<NuccoreDoc>(DB_NUCCORE, accessions).await?;
        Ok(records_from(body))
    }

    async fn publication_summaries(&self, ids: &[String]) -> Result<Vec<PublicationSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.esummary::<PubmedDoc>(DB_PUBMED, ids).await?;
        Ok(publications_from(body))
    }

    async fn full_records(&self, accessions: &[String]) -> Result<String> {
        if accessions.is_empty() {
            return Ok(String::new());
        }

        let mut params = self.common_params();
        params.push(("db", DB_NUCCORE.to_string()));
        params.push(("id", accessions.join(",")));
        params.push(("rettype", "gb".to_string()));
        params.push(("retmode", "text".to_string()));

        let response = self.get_with_retry("efetch", params).await?;
        response
            .text()
            .await
            .context("efetch body could not be read")
    }
}

// --- Response conversion ---

/// Linked ids of each link set, one list per requested accession.
///
/// Link sets are returned in request order; accessions the service had nothing for come
/// back as empty lists.
pub(crate) fn link_lists(body: ELinkResponse, expected: usize) -> Vec<Vec<String>> {
    let mut linked: Vec<Vec<String>> = body
        .linksets
        .into_iter()
        .map(|set| {
            set.linksetdbs
                .into_iter()
                .flat_map(|db| db.links)
                .collect()
        })
        .collect();

    linked.resize(expected, Vec::new());
    linked
}

pub(crate) fn records_from(body: ESummaryResponse<NuccoreDoc>) -> Vec<RecordSummary> {
    body.result
        .into_documents()
        .into_iter()
        .filter_map(|(_, doc)| {
            Some(RecordSummary {
                accession_version: clean(doc.accessionversion)?,
                caption: clean(doc.caption),
                title: clean(doc.title),
                organism: clean(doc.organism),
                length: doc.slen,
            })
        })
        .collect()
}

pub(crate) fn publications_from(body: ESummaryResponse<PubmedDoc>) -> Vec<PublicationSummary> {
    body.result
        .into_documents()
        .into_iter()
        .map(|(uid, doc)| PublicationSummary {
            doi: clean(doc.doi().map(str::to_string)),
            id: uid,
            title: clean(doc.title),
            authors: doc
                .authors
                .into_iter()
                .filter_map(|author| clean(author.name))
                .collect(),
            last_author: clean(doc.lastauthor),
            journal: clean(doc.fulljournalname),
            pub_date: clean(doc.pubdate),
            reference_count: doc.pmcrefcount.and_then(|n| u32::try_from(n).ok()),
        })
        .collect()
}

/// Trims a text field; blank counts as absent.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//! E-utilities Wire Formats
//!
//! Typed views of the JSON bodies returned by `elink` and `esummary`. Only the fields the
//! enrichment pipeline reads are modelled; everything else is ignored. Identifiers and
//! counts arrive as JSON numbers or as numeric strings depending on the endpoint, so both
//! are accepted.

use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;
use std::collections::HashMap;

/// Body of `elink.fcgi?retmode=json`.
#[derive(Debug, Deserialize)]
pub struct ELinkResponse {
    /// One entry per `id` parameter, in request order.
    pub linksets: Vec<LinkSet>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkSet {
    pub linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LinkSetDb {
    pub linkname: Option<String>,
    #[serde(deserialize_with = "id_list")]
    pub links: Vec<String>,
}

/// Body of `esummary.fcgi?retmode=json` for documents of type `D`.
#[derive(Debug, Deserialize)]
pub struct ESummaryResponse<D> {
    pub result: ESummaryResult<D>,
}

/// `uids` lists the documents in request order; each document sits under its own uid key.
#[derive(Debug, Deserialize)]
pub struct ESummaryResult<D> {
    pub uids: Vec<String>,
    #[serde(flatten)]
    pub documents: HashMap<String, D>,
}

/// Document fields shared by every database: a uid the service could not resolve comes back
/// with only `error` set.
pub trait SummaryDocument {
    fn error(&self) -> Option<&str>;
}

impl<D: SummaryDocument> ESummaryResult<D> {
    /// Resolved documents with their uids, in `uids` order.
    pub fn into_documents(mut self) -> Vec<(String, D)> {
        let uids = std::mem::take(&mut self.uids);
        uids.into_iter()
            .filter_map(|uid| {
                let doc = self.documents.remove(&uid)?;
                doc.error().is_none().then_some((uid, doc))
            })
            .collect()
    }
}

/// `nuccore` document summary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NuccoreDoc {
    pub caption: Option<String>,
    pub title: Option<String>,
    pub accessionversion: Option<String>,
    pub organism: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    pub slen: Option<u64>,
    pub error: Option<String>,
}

impl SummaryDocument for NuccoreDoc {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// `pubmed` document summary.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PubmedDoc {
    pub title: Option<String>,
    pub authors: Vec<PubmedAuthor>,
    pub lastauthor: Option<String>,
    pub fulljournalname: Option<String>,
    pub pubdate: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    pub pmcrefcount: Option<u64>,
    pub articleids: Vec<ArticleId>,
    pub error: Option<String>,
}

impl SummaryDocument for PubmedDoc {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl PubmedDoc {
    pub fn doi(&self) -> Option<&str> {
        self.articleids
            .iter()
            .find(|id| id.idtype == "doi")
            .map(|id| id.value.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PubmedAuthor {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArticleId {
    pub idtype: String,
    pub value: String,
}

// --- Lenient scalars ---

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
    Other(IgnoredAny),
}

/// Accepts `42`, `"42"`, `""` or `null`; anything unparsable becomes `None`.
fn optional_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Ok(match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Some(n),
        NumberOrText::Text(s) => s.trim().parse().ok(),
        NumberOrText::Other(_) => None,
    })
}

/// Identifier list whose entries may be numbers or strings.
fn id_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let ids = Vec::<NumberOrText>::deserialize(deserializer)?;
    Ok(ids
        .into_iter()
        .filter_map(|id| match id {
            NumberOrText::Number(n) => Some(n.to_string()),
            NumberOrText::Text(s) => Some(s),
            NumberOrText::Other(_) => None,
        })
        .collect())
}

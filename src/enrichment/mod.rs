//! Metadata Enrichment Module
//!
//! Attaches bibliographic metadata to the accessions of a ranked result.
//!
//! ## Workflow
//! 1. **Link lookup**: One batched cross-reference call asks which accessions have linked
//!    publications.
//! 2. **Summary path**: Linked accessions get compact record and publication summaries,
//!    normalised into [`types::RecordMetadata`].
//! 3. **Full-text path**: Unlinked accessions fall back to full flat-file retrieval, parsed by a
//!    [`source::FlatFileParser`] (GenBank by default).
//! 4. **Merge**: Metadata is attached in ranking order; a hit with nothing found gets an empty
//!    metadata object rather than being dropped.

pub mod entrez;
pub mod genbank;
pub mod pipeline;
pub mod protocol;
pub mod source;
pub mod summary;
pub mod types;

#[cfg(test)]
mod tests;

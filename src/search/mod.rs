//! Result Aggregation Module
//!
//! Merges the partial result sets returned by shard workers into the final ranking
//! for a query.
//!
//! ## Overview
//! Every shard searches its own partition of the reference database and reports at most
//! `TOP_K` hits. Once all expected replies for a job have arrived, the lists are
//! concatenated, ordered by alignment score and cut down to the global top-K.
//!
//! ## Submodules
//! - **`aggregator`**: The pure merge/rank function.
//! - **`types`**: Shard hit and ranked result records.

pub mod aggregator;
pub mod types;

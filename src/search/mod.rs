//! Token search over flattened extension records.
//!
//! This module provides identifier-aware tokenization, the in-memory index, and the
//! relevance rules used to rank matches.

pub mod index;
pub mod scoring;
pub mod tokenize;

pub use index::{MAX_RESULTS, SearchIndex, SearchMatch};
pub use tokenize::{split_identifier, split_nonword, tokenize_query, tokenize_record};

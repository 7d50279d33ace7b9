//! In-memory token index over field and code records.
//!
//! Tokens are folded to lowercase and stored in an ordered map, so prefix matches
//! are a range scan and substring matches a scan of the vocabulary. A record matches
//! a query when every query token matches at least one of its tokens; its rank is the
//! sum of the best relevance per query token.

use super::scoring::{SUBSTRING, SUGGESTION_THRESHOLD, calculate_relevance, similarity};
use super::tokenize::{tokenize_query, tokenize_record};
use crate::registry::{ExtractOptions, Registry};
use crate::types::Record;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::time::Instant;

/// Upper bound on results per query.
pub const MAX_RESULTS: usize = 1000;

/// Position of a record in the index.
type DocId = u32;

/// Lowercased token to the sorted, de-duplicated documents containing it.
#[derive(Debug, Clone, Default)]
struct TokenIndex {
    postings: BTreeMap<String, Vec<DocId>>,
}

impl TokenIndex {
    fn add(&mut self, token: &str, doc: DocId) {
        let docs = self.postings.entry(token.to_lowercase()).or_default();
        // Documents are added in increasing order, so only the tail can repeat
        if docs.last() != Some(&doc) {
            docs.push(doc);
        }
    }

    /// Best relevance of any indexed token for `query` (lowercase), per document.
    fn lookup(&self, query: &str) -> AHashMap<DocId, u32> {
        let mut best: AHashMap<DocId, u32> = AHashMap::new();
        let mut record = |docs: &[DocId], relevance: u32| {
            for &doc in docs {
                let entry = best.entry(doc).or_insert(0);
                *entry = (*entry).max(relevance);
            }
        };

        // Exact and prefix matches are contiguous in the ordered vocabulary
        for (token, docs) in self.postings.range(query.to_string()..) {
            if !token.starts_with(query) {
                break;
            }
            if let Some(relevance) = calculate_relevance(token, query) {
                record(docs, relevance);
            }
        }

        for (token, docs) in &self.postings {
            if !token.starts_with(query) && token.contains(query) {
                record(docs, SUBSTRING);
            }
        }

        best
    }

    fn term_count(&self) -> usize {
        self.postings.len()
    }

    fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }
}

/// A ranked reference into a [`SearchIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub doc: usize,
    pub rank: u32,
}

/// Records plus their token index. Immutable once built.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    records: Vec<Record>,
    tokens: TokenIndex,
    generation: u64,
}

impl SearchIndex {
    /// Tokenize and index `records`, keeping their order.
    pub fn build(records: Vec<Record>, generation: u64) -> Self {
        let start = Instant::now();
        let mut tokens = TokenIndex::default();

        for (doc, record) in records.iter().enumerate() {
            let doc = DocId::try_from(doc).unwrap_or(DocId::MAX);
            for token in tokenize_record(record) {
                tokens.add(&token, doc);
            }
        }

        let index = Self {
            records,
            tokens,
            generation,
        };

        tracing::info!(
            "Built search index {}: {} records ({} fields, {} codes), {} unique terms in {:?}",
            generation,
            index.record_count(),
            index.field_count(),
            index.code_count(),
            index.term_count(),
            start.elapsed()
        );

        index
    }

    /// Extract records from a registry snapshot and index them.
    pub fn from_registry(registry: &Registry, options: &ExtractOptions, generation: u64) -> Self {
        Self::build(registry.extract_records(options), generation)
    }

    /// Find records matching every token of `query`, best first, at most `limit`.
    ///
    /// Ties keep record order. A query without tokens matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchMatch> {
        let mut query_tokens: Vec<String> = tokenize_query(query)
            .into_iter()
            .map(|token| token.to_lowercase())
            .collect();
        query_tokens.sort_unstable();
        query_tokens.dedup();

        let Some((first, rest)) = query_tokens.split_first() else {
            return vec![];
        };

        let mut combined = self.tokens.lookup(first);
        for token in rest {
            if combined.is_empty() {
                break;
            }
            let matches = self.tokens.lookup(token);
            combined.retain(|doc, rank| match matches.get(doc) {
                Some(relevance) => {
                    *rank += relevance;
                    true
                }
                None => false,
            });
        }

        let mut results: Vec<SearchMatch> = combined
            .into_iter()
            .map(|(doc, rank)| SearchMatch {
                doc: doc as usize,
                rank,
            })
            .collect();
        results.sort_by(|a, b| b.rank.cmp(&a.rank).then(a.doc.cmp(&b.doc)));
        results.truncate(limit.min(MAX_RESULTS));
        results
    }

    /// Vocabulary terms similar to the query's tokens, best first.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<String> {
        let query_tokens: Vec<String> = tokenize_query(query)
            .into_iter()
            .map(|token| token.to_lowercase())
            .collect();

        let mut scored: Vec<(f64, &str)> = self
            .tokens
            .terms()
            .filter_map(|term| {
                let score = query_tokens
                    .iter()
                    .map(|token| similarity(token, term))
                    .fold(0.0, f64::max);
                (score >= SUGGESTION_THRESHOLD).then_some((score, term))
            })
            .collect();

        scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, term)| term.to_string())
            .collect()
    }

    pub fn record(&self, doc: usize) -> Option<&Record> {
        self.records.get(doc)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn field_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_code()).count()
    }

    pub fn code_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_code()).count()
    }

    /// Get the number of unique terms in the index
    pub fn term_count(&self) -> usize {
        self.tokens.term_count()
    }
}

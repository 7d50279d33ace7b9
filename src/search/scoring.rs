//! Relevance of indexed tokens to query tokens.
//!
//! Both sides are compared in lowercase.

use rapidfuzz::distance::jaro_winkler;

/// Relevance of an exact token match.
pub const EXACT: u32 = 100;
/// Relevance when the token starts with the query token.
pub const PREFIX: u32 = 50;
/// Relevance when the token contains the query token elsewhere.
pub const SUBSTRING: u32 = 10;

/// Minimum similarity for a vocabulary token to be offered as a suggestion.
pub const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Calculate simple text relevance score.
///
/// Returns a score based on how well the query matches the text:
/// - 100: Exact match
/// - 50: Text starts with query
/// - 10: Text contains query
/// - None: No match
///
/// Both arguments must already be lowercase.
pub fn calculate_relevance(text: &str, query: &str) -> Option<u32> {
    if text == query {
        Some(EXACT)
    } else if text.starts_with(query) {
        Some(PREFIX)
    } else if text.contains(query) {
        Some(SUBSTRING)
    } else {
        None
    }
}

/// Similarity between a query token and an indexed token, in `[0, 1]`.
pub fn similarity(query: &str, token: &str) -> f64 {
    jaro_winkler::similarity(query.chars(), token.chars())
}

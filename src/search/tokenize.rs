//! Tokenization of records and queries.
//!
//! Every indexed property is split on runs of non-word characters. `code` and `path`
//! additionally go through identifier-aware splitting, which breaks camelCase humps and
//! underscores, so `tender.numberOfTenderers` yields both `numberOfTenderers` and
//! `number`, `Of`, `Tenderers`.
//!
//! Tokens keep their case. Matching folds case when comparing.

use crate::types::{Property, Record};
use regex::Regex;
use std::sync::LazyLock;

/// Runs of characters that are not alphanumeric or `_`.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("static pattern is valid"));

/// Runs of non-word characters or underscores.
static IDENTIFIER_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\W_]+").expect("static pattern is valid"));

/// Tokens for a record across all indexed properties.
///
/// Duplicates are kept; the index collapses them.
pub fn tokenize_record(record: &Record) -> Vec<String> {
    let mut tokens = vec![];

    for property in Property::SEARCHABLE {
        let Some(text) = record.property(property) else {
            continue;
        };

        tokens.extend(split_nonword(text).map(str::to_string));

        if property.is_identifier() {
            tokens.extend(split_identifier(text));
        }
    }

    tokens
}

/// Tokens for user input. No camelCase splitting is applied.
pub fn tokenize_query(query: &str) -> Vec<String> {
    split_nonword(query).map(str::to_string).collect()
}

/// Split on non-word runs, dropping empty pieces.
pub fn split_nonword(text: &str) -> impl Iterator<Item = &str> {
    NON_WORD.split(text).filter(|token| !token.is_empty())
}

/// Split an identifier on camelCase humps, underscores and non-word runs.
pub fn split_identifier(text: &str) -> Vec<String> {
    let spaced = separate_humps(text);
    IDENTIFIER_BOUNDARY
        .split(&spaced)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Insert a space between each lowercase letter and a directly following uppercase letter.
fn separate_humps(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut previous_lower = false;

    for c in text.chars() {
        if previous_lower && c.is_uppercase() {
            out.push(' ');
        }
        out.push(c);
        previous_lower = c.is_lowercase();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{escape_text, render_markdown};
    use crate::types::{CodeRecord, ExtensionMetadata, FieldRecord};
    use assert2::check;
    use rstest::rstest;
    use std::sync::Arc;

    fn metadata() -> Arc<ExtensionMetadata> {
        Arc::new(ExtensionMetadata {
            id: "bids".to_string(),
            version: "v1.1.5".to_string(),
            name: "Bids".to_string(),
        })
    }

    fn field(path: &str, title: Option<&str>, description: Option<&str>) -> Record {
        Record::Field(FieldRecord {
            title: title.map(escape_text),
            description: description.map(render_markdown),
            extension: metadata(),
            schema: Arc::from("release-schema.json"),
            path: path.to_string(),
            type_name: String::new(),
        })
    }

    #[rstest]
    #[case("tender.numberOfTenderers", &["tender", "numberOfTenderers"])]
    #[case("  leading and trailing!  ", &["leading", "and", "trailing"])]
    #[case("snake_case-value", &["snake_case", "value"])]
    #[case("", &[])]
    #[case("...", &[])]
    fn test_split_nonword(#[case] input: &str, #[case] expected: &[&str]) {
        let tokens: Vec<&str> = split_nonword(input).collect();
        check!(tokens == expected);
    }

    #[rstest]
    #[case("tender.numberOfTenderers", &["tender", "number", "Of", "Tenderers"])]
    #[case("snake_case_value", &["snake", "case", "value"])]
    #[case("HTTPServer", &["HTTPServer"])]
    #[case("parseJSON", &["parse", "JSON"])]
    #[case("lot2Bid", &["lot2Bid"])]
    #[case("awardID", &["award", "ID"])]
    fn test_split_identifier(#[case] input: &str, #[case] expected: &[&str]) {
        check!(split_identifier(input) == expected);
    }

    #[test]
    fn test_path_tokens_include_camel_pieces_and_whole_segment() {
        let tokens = tokenize_record(&field("tender.numberOfTenderers", None, None));
        for expected in ["tender", "number", "Of", "Tenderers", "numberOfTenderers"] {
            check!(tokens.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_title_and_description_not_camel_split() {
        let tokens = tokenize_record(&field(
            "x",
            Some("numberOfTenderers"),
            Some("See [the docs](https://example.com/valueOf)."),
        ));
        check!(tokens.contains(&"numberOfTenderers".to_string()));
        check!(!tokens.contains(&"number".to_string()));
        // Description contributes its text content, not link targets or tags
        check!(tokens.contains(&"docs".to_string()));
        check!(!tokens.contains(&"https".to_string()));
        check!(!tokens.contains(&"p".to_string()));
    }

    #[test]
    fn test_code_record_tokens() {
        let record = Record::Code(CodeRecord {
            extension: metadata(),
            codelist: Arc::from("partyRole.csv"),
            code: "leadBidder".to_string(),
            title: Some(escape_text("Lead bidder")),
            description: render_markdown(""),
        });
        let tokens = tokenize_record(&record);
        check!(tokens == ["leadBidder", "lead", "Bidder", "Lead", "bidder"]);
    }

    #[test]
    fn test_query_not_camel_split() {
        check!(tokenize_query("numberOf") == ["numberOf"]);
        check!(tokenize_query("tender number") == ["tender", "number"]);
        check!(tokenize_query("  ").is_empty());
    }

    #[test]
    fn test_case_preserved() {
        check!(tokenize_query("Tender") == ["Tender"]);
    }

    #[rstest]
    #[case("Québec")]
    #[case("日本")]
    #[case("🦀")]
    fn test_unicode_handling(#[case] input: &str) {
        // Should not panic, even if it produces empty results
        let _tokens = split_identifier(input);
        let _tokens = tokenize_query(input);
    }
}

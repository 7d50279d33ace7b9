//! Field and code search handler.

use crate::error::IndexError;
use crate::types::{CodeRecord, ExtensionMetadata, FieldRecord, Record};
use crate::worker::{IndexState, QueryResults};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Default number of results rendered per call.
const DEFAULT_LIMIT: usize = 10;

/// Number of "did you mean" terms offered when nothing matches.
const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Readable listing with headings and explorer links
    #[default]
    Text,
    /// Records serialized as JSON
    Json,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchRequest {
    /// Words to look for in field paths, codes, titles and descriptions (e.g. "numberOf tenderers")
    pub query: String,
    /// Maximum number of results to return (default: 10, at most 1000)
    #[serde(default)]
    pub limit: Option<usize>,
    /// Output format (default: text)
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

/// Run a search and render the results.
pub fn handle_search(
    state: &IndexState,
    explorer_url: &str,
    request: SearchRequest,
) -> Result<String, String> {
    let results = state.query(&request.query).map_err(|e| match e {
        IndexError::IndexNotReady => format!(
            "{}\n\nThe registry is still being indexed. Try again shortly, or call `refresh`.",
            e
        ),
        e => e.to_string(),
    })?;

    let limit = request.limit.unwrap_or(DEFAULT_LIMIT);
    match request.format.unwrap_or_default() {
        OutputFormat::Json => format_json(&request.query, &results, limit),
        OutputFormat::Text if results.is_empty() => Ok(format_no_results(
            &request.query,
            &state.suggest(&request.query, SUGGESTION_LIMIT),
        )),
        OutputFormat::Text => Ok(format_search_results(
            &request.query,
            &results,
            limit,
            explorer_url,
        )),
    }
}

#[derive(Serialize)]
struct JsonResult<'a> {
    rank: u32,
    #[serde(flatten)]
    record: &'a Record,
}

#[derive(Serialize)]
struct JsonResponse<'a> {
    query: &'a str,
    generation: u64,
    total: usize,
    results: Vec<JsonResult<'a>>,
}

fn format_json(query: &str, results: &QueryResults, limit: usize) -> Result<String, String> {
    let response = JsonResponse {
        query,
        generation: results.index().generation(),
        total: results.len(),
        results: results
            .iter()
            .take(limit)
            .map(|(record, rank)| JsonResult { rank, record })
            .collect(),
    };
    serde_json::to_string_pretty(&response).map_err(|e| format!("Failed to serialize results: {}", e))
}

fn format_no_results(query: &str, suggestions: &[String]) -> String {
    let mut msg = format!("No results found for '{}'.\n\n", query);

    if !suggestions.is_empty() {
        msg.push_str("Did you mean:\n");
        for suggestion in suggestions {
            let _ = writeln!(msg, "• {}", suggestion);
        }
        msg.push('\n');
    }

    msg.push_str("Search tips:\n");
    msg.push_str("• Every word must match; try fewer words\n");
    msg.push_str("• Field paths split on dots and camelCase: 'numberOf' matches 'numberOfTenderers'\n");
    msg.push_str("• Codes and titles match by prefix: 'disq' matches 'disqualified'\n");
    msg
}

/// Format search results into a readable listing.
fn format_search_results(
    query: &str,
    results: &QueryResults,
    limit: usize,
    explorer_url: &str,
) -> String {
    let shown = results.len().min(limit);
    let mut output = format!(
        "Search results for '{}' ({} of {}):\n\n",
        query,
        shown,
        results.len()
    );

    for (idx, (record, _)) in results.iter().take(limit).enumerate() {
        match record {
            Record::Field(field) => write_field(&mut output, idx + 1, field, explorer_url),
            Record::Code(code) => write_code(&mut output, idx + 1, code, explorer_url),
        }
        output.push('\n');
    }

    output
}

fn write_field(output: &mut String, position: usize, field: &FieldRecord, explorer_url: &str) {
    let _ = write!(output, "{}. Field: `{}`", position, field.path);
    if !field.type_name.is_empty() {
        let _ = write!(output, " ({})", field.type_name);
    }
    output.push('\n');

    if let Some(title) = &field.title {
        let _ = writeln!(output, "   {}", title.text());
    }
    write_summary(output, field.description.as_ref().map(|d| d.text()));
    let _ = writeln!(
        output,
        "   {} · {} · {}",
        field.extension.name,
        field.schema,
        extension_url(explorer_url, &field.extension)
    );
}

fn write_code(output: &mut String, position: usize, code: &CodeRecord, explorer_url: &str) {
    let _ = writeln!(
        output,
        "{}. Code: `{}` in {}",
        position, code.code, code.codelist
    );

    if let Some(title) = &code.title {
        let _ = writeln!(output, "   {}", title.text());
    }
    write_summary(output, Some(code.description.text()));
    let _ = writeln!(
        output,
        "   {} · {}codelists/#{}",
        code.extension.name,
        extension_url(explorer_url, &code.extension),
        code.codelist
    );
}

/// First sentence-ish line of a description.
fn write_summary(output: &mut String, text: Option<&str>) {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    let summary = text.lines().next().unwrap_or(text);
    let _ = writeln!(output, "   {}", summary);
}

/// Explorer page of one extension version, with a trailing slash.
pub fn extension_url(explorer_url: &str, extension: &ExtensionMetadata) -> String {
    format!(
        "{}/{}/{}/",
        explorer_url.trim_end_matches('/'),
        extension.id,
        extension.version
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn test_extension_url() {
        let extension = ExtensionMetadata {
            id: "bids".to_string(),
            version: "v1.1.5".to_string(),
            name: "Bid statistics".to_string(),
        };
        check!(
            extension_url("https://extensions.open-contracting.org/en/extensions/", &extension)
                == "https://extensions.open-contracting.org/en/extensions/bids/v1.1.5/"
        );
    }

    #[test]
    fn test_no_results_lists_suggestions() {
        let msg = format_no_results("tendr", &["tender".to_string()]);
        check!(msg.contains("No results found for 'tendr'"));
        check!(msg.contains("• tender"));

        let msg = format_no_results("zzz", &[]);
        check!(!msg.contains("Did you mean"));
    }

    #[test]
    fn test_request_defaults() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "tender"}"#).unwrap();
        check!(request.limit.is_none());
        check!(request.format.unwrap_or_default() == OutputFormat::Text);

        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "tender", "format": "json"}"#).unwrap();
        check!(request.format == Some(OutputFormat::Json));
    }
}

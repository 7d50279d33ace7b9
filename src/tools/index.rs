//! Index lifecycle handlers: rebuild and status.

use crate::error::IndexError;
use crate::search::SearchIndex;
use crate::worker::{IndexState, IndexStatus};
use std::fmt::Write as _;

/// Rebuild the index from the registry and report what was indexed.
pub async fn handle_refresh(state: &IndexState) -> Result<String, String> {
    match state.refresh().await {
        Ok(index) => Ok(format_refreshed(&index)),
        Err(IndexError::Superseded { generation }) => Ok(format!(
            "Build {} was superseded by a newer refresh; the newer index will be used.",
            generation
        )),
        Err(e) => Err(match state.current() {
            Some(index) => format!(
                "{}\n\nStill serving index {} ({} records).",
                e,
                index.generation(),
                index.record_count()
            ),
            None => e.to_string(),
        }),
    }
}

fn format_refreshed(index: &SearchIndex) -> String {
    format!(
        "Index {} built: {} records ({} fields, {} codes), {} unique terms.",
        index.generation(),
        index.record_count(),
        index.field_count(),
        index.code_count(),
        index.term_count()
    )
}

pub fn handle_index_status(state: &IndexState) -> String {
    format_status(&state.status())
}

fn format_status(status: &IndexStatus) -> String {
    let mut output = String::new();

    if status.ready {
        let _ = writeln!(output, "Index ready (generation {})", status.generation);
        let _ = writeln!(output, "• Records: {}", status.records);
        let _ = writeln!(output, "• Fields: {}", status.fields);
        let _ = writeln!(output, "• Codes: {}", status.codes);
        let _ = writeln!(output, "• Unique terms: {}", status.terms);
    } else {
        output.push_str("Index not ready\n");
    }

    if status.building {
        let _ = writeln!(output, "Build {} in progress", status.latest_requested);
    }

    output
}

//! Code records from codelist tables.

use crate::markup::{escape_text, render_markdown};
use crate::registry::CodelistRow;
use crate::types::{CodeRecord, ExtensionMetadata};
use std::sync::Arc;

/// One record per row of `codelist`. Rows without a code are skipped.
pub fn extract_codes(
    metadata: &Arc<ExtensionMetadata>,
    codelist: &str,
    rows: &[CodelistRow],
) -> Vec<CodeRecord> {
    let name: Arc<str> = Arc::from(codelist);
    let mut skipped = 0usize;

    let records: Vec<CodeRecord> = rows
        .iter()
        .filter_map(|row| {
            let Some(code) = row.code.clone() else {
                skipped += 1;
                return None;
            };
            Some(CodeRecord {
                extension: Arc::clone(metadata),
                codelist: Arc::clone(&name),
                code,
                title: row.title.as_deref().map(escape_text),
                description: render_markdown(row.description.as_deref().unwrap_or_default()),
            })
        })
        .collect();

    if skipped > 0 {
        tracing::debug!(
            "Skipped {} rows without a code in {} of {}",
            skipped,
            codelist,
            metadata.id
        );
    }

    records
}

//! Extension registry: document model, sources, and record extraction.

pub mod model;
pub mod source;

pub use model::{
    CodelistRow, DEFAULT_LOCALE, ExtensionEntry, ExtensionVersion, RELEASE_SCHEMA, Registry,
};
pub use source::{FileSource, HttpSource, RegistrySource, StaticSource};

use crate::schema::{DEFAULT_MAX_DEPTH, extract_codes, flatten_with_limit};
use crate::types::{ExtensionMetadata, Record};
use std::sync::Arc;

/// What to extract from each registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub locale: String,
    pub schema_files: Vec<String>,
    pub max_schema_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            schema_files: vec![RELEASE_SCHEMA.to_string()],
            max_schema_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Registry {
    /// Flatten every extension's latest version into field and code records.
    ///
    /// Missing versions, schemas and codelists produce fewer records; a schema that
    /// trips the depth guard is skipped with a warning.
    pub fn extract_records(&self, options: &ExtractOptions) -> Vec<Record> {
        let mut records = Vec::new();

        for (id, entry) in self.extensions() {
            let Some((version, release)) = entry.latest() else {
                tracing::debug!("Extension '{}' has no usable latest version", id);
                continue;
            };

            let metadata = Arc::new(ExtensionMetadata {
                id: id.to_string(),
                version: version.to_string(),
                name: entry.display_name(&options.locale).unwrap_or(id).to_string(),
            });

            for file in &options.schema_files {
                let Some(schema) = release.schema(file, &options.locale) else {
                    continue;
                };
                match flatten_with_limit(&metadata, file, "", &schema, options.max_schema_depth) {
                    Ok(fields) => records.extend(fields.into_iter().map(Record::from)),
                    Err(e) => tracing::warn!("Skipping schema: {}", e),
                }
            }

            for (codelist, rows) in release.codelists(&options.locale) {
                records.extend(
                    extract_codes(&metadata, codelist, &rows)
                        .into_iter()
                        .map(Record::from),
                );
            }
        }

        records
    }
}

//! Shape of the extension registry document.
//!
//! Parsing is lenient: anything that does not match the expected shape is treated as
//! absent rather than failing the whole document.

use crate::error::Result;
use crate::schema::SchemaNode;
use anyhow::Context;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::fmt;

/// Locale used when the configured locale has no entry.
pub const DEFAULT_LOCALE: &str = "en";

/// The schema document indexed by default.
pub const RELEASE_SCHEMA: &str = "release-schema.json";

/// Parsed registry: extension id to entry, in document order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    extensions: Vec<(String, ExtensionEntry)>,
}

impl Registry {
    /// Parse a registry document. Only a top level that is not a JSON object is an error.
    ///
    /// Entries are parsed one at a time, so an entry that is malformed or nested past the
    /// parser's limit is skipped without affecting the others.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let RawEntries(entries) = serde_json::from_slice(bytes)
            .context("Registry document is not a valid JSON object")?;

        let mut extensions = Vec::with_capacity(entries.len());
        for (id, raw) in entries {
            match serde_json::from_str::<ExtensionEntry>(raw.get()) {
                Ok(entry) => extensions.push((id, entry)),
                Err(e) => tracing::warn!("Skipping malformed registry entry '{}': {}", id, e),
            }
        }

        Ok(Self { extensions })
    }

    pub fn extensions(&self) -> impl Iterator<Item = (&str, &ExtensionEntry)> {
        self.extensions.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Top-level entries with their values left unparsed, in document order.
struct RawEntries(Vec<(String, Box<RawValue>)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping extension ids to entries")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawEntries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// One registry entry. Versions are kept raw and parsed on demand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionEntry {
    #[serde(default)]
    pub name: Map<String, Value>,
    #[serde(default)]
    pub latest_version: Option<String>,
    #[serde(default)]
    pub versions: Map<String, Value>,
}

impl ExtensionEntry {
    /// Localized display name.
    pub fn display_name(&self, locale: &str) -> Option<&str> {
        localized(&self.name, locale).and_then(Value::as_str)
    }

    /// The latest version's identifier and contents, if both are present and well-formed.
    pub fn latest(&self) -> Option<(&str, ExtensionVersion)> {
        let version = self.latest_version.as_deref()?;
        let value = self.versions.get(version)?;
        match ExtensionVersion::deserialize(value) {
            Ok(release) => Some((version, release)),
            Err(e) => {
                tracing::warn!("Ignoring malformed version {}: {}", version, e);
                None
            }
        }
    }
}

/// Contents of one extension version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtensionVersion {
    #[serde(default)]
    pub schemas: Map<String, Value>,
    #[serde(default)]
    pub codelists: Map<String, Value>,
}

impl ExtensionVersion {
    /// Localized schema document named `file`.
    pub fn schema(&self, file: &str, locale: &str) -> Option<SchemaNode> {
        let localizations = self.schemas.get(file)?.as_object()?;
        localized(localizations, locale).map(SchemaNode::from)
    }

    /// Localized rows of every codelist, in document order. Malformed tables are skipped.
    pub fn codelists<'a>(
        &'a self,
        locale: &'a str,
    ) -> impl Iterator<Item = (&'a str, Vec<CodelistRow>)> + 'a {
        self.codelists.iter().filter_map(move |(name, value)| {
            let table = localized(value.as_object()?, locale)?;
            match CodelistTable::deserialize(table) {
                Ok(table) => Some((name.as_str(), table.rows)),
                Err(e) => {
                    tracing::warn!("Ignoring malformed codelist {}: {}", name, e);
                    None
                }
            }
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CodelistTable {
    #[serde(default)]
    rows: Vec<CodelistRow>,
}

/// One codelist row. Numbers are accepted as text; other non-strings are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CodelistRow {
    #[serde(rename = "Code", default, deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(rename = "Title", default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(rename = "Description", default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn localized<'a>(map: &'a Map<String, Value>, locale: &str) -> Option<&'a Value> {
    map.get(locale).or_else(|| map.get(DEFAULT_LOCALE))
}

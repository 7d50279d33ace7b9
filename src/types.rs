//! Records produced by flattening schemas and codelists.

use crate::markup::SafeHtml;
use serde::Serialize;
use std::sync::Arc;

/// Identity of the registry entry that produced a record.
///
/// One instance per extension, shared by every record built from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ExtensionMetadata {
    pub id: String,
    pub version: String,
    pub name: String,
}

/// A schema node that carries a title or description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FieldRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<SafeHtml>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<SafeHtml>,
    pub extension: Arc<ExtensionMetadata>,
    /// Originating document name, e.g. `release-schema.json`.
    pub schema: Arc<str>,
    /// Dotted path from the document root.
    pub path: String,
    /// Comma-joined type names with `null` removed.
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One row of a codelist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CodeRecord {
    pub extension: Arc<ExtensionMetadata>,
    pub codelist: Arc<str>,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<SafeHtml>,
    pub description: SafeHtml,
}

/// Either kind of indexed record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Field(FieldRecord),
    Code(CodeRecord),
}

/// Record properties that contribute search tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Code,
    Path,
    Title,
    Description,
}

impl Property {
    /// Indexed properties, in tokenization order.
    pub const SEARCHABLE: [Self; 4] = [Self::Code, Self::Path, Self::Title, Self::Description];

    /// Whether identifier-aware splitting applies to this property.
    pub const fn is_identifier(self) -> bool {
        matches!(self, Self::Code | Self::Path)
    }
}

impl Record {
    pub fn extension(&self) -> &ExtensionMetadata {
        match self {
            Self::Field(field) => &field.extension,
            Self::Code(code) => &code.extension,
        }
    }

    pub fn title(&self) -> Option<&SafeHtml> {
        match self {
            Self::Field(field) => field.title.as_ref(),
            Self::Code(code) => code.title.as_ref(),
        }
    }

    pub fn description(&self) -> Option<&SafeHtml> {
        match self {
            Self::Field(field) => field.description.as_ref(),
            Self::Code(code) => Some(&code.description),
        }
    }

    /// Text of an indexed property. Titles and descriptions contribute their text content.
    pub fn property(&self, property: Property) -> Option<&str> {
        match (self, property) {
            (Self::Code(code), Property::Code) => Some(&code.code),
            (Self::Field(field), Property::Path) => Some(&field.path),
            (_, Property::Title) => self.title().map(SafeHtml::text),
            (_, Property::Description) => self.description().map(SafeHtml::text),
            _ => None,
        }
    }

    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }
}

impl From<FieldRecord> for Record {
    fn from(record: FieldRecord) -> Self {
        Self::Field(record)
    }
}

impl From<CodeRecord> for Record {
    fn from(record: CodeRecord) -> Self {
        Self::Code(record)
    }
}

//! Recursive flattening of schema documents into field records.
//!
//! The walk visits every node of the tree. Object nodes with a string `title` or
//! `description` become a [`FieldRecord`] at the current dotted path; every key of an
//! object (recognized or not) is walked with a child path from [`child_path`], and
//! array elements are walked with the parent's path unchanged.

use crate::error::IndexError;
use crate::markup::{escape_text, render_markdown};
use crate::schema::node::{Scalar, SchemaNode};
use crate::types::{ExtensionMetadata, FieldRecord};
use std::sync::Arc;

/// Default nesting guard. Real release schemas stay well below this.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Highest usable guard. A schema sits about seven levels into its registry entry, and
/// `serde_json` refuses input nested past 128 levels, so deeper guards could never fire.
pub const MAX_SCHEMA_DEPTH: usize = 100;

/// Flatten a schema document with the default depth guard.
pub fn flatten(
    metadata: &Arc<ExtensionMetadata>,
    document: &str,
    base_path: &str,
    node: &SchemaNode,
) -> Result<Vec<FieldRecord>, IndexError> {
    flatten_with_limit(metadata, document, base_path, node, DEFAULT_MAX_DEPTH)
}

/// Flatten a schema document, failing with [`IndexError::SchemaTooDeep`] past `max_depth`.
pub fn flatten_with_limit(
    metadata: &Arc<ExtensionMetadata>,
    document: &str,
    base_path: &str,
    node: &SchemaNode,
    max_depth: usize,
) -> Result<Vec<FieldRecord>, IndexError> {
    let mut flattener = Flattener {
        metadata: Arc::clone(metadata),
        document: Arc::from(document),
        max_depth,
        records: Vec::new(),
    };
    flattener.walk(node, base_path, 0)?;
    Ok(flattener.records)
}

/// Path of `key` under `parent`.
///
/// `properties` never appears in a path, and `definitions` is dropped at the root only.
pub fn child_path(parent: &str, key: &str) -> String {
    if key == "properties" || (key == "definitions" && parent.is_empty()) {
        parent.to_string()
    } else if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Display string for a node's `type`, with the first `null` removed.
pub fn normalize_type(node: &SchemaNode) -> String {
    let mut types: Vec<&str> = match node.get("type") {
        Some(SchemaNode::Scalar(Scalar::String(name))) => vec![name.as_str()],
        Some(SchemaNode::Array(items)) => items.iter().filter_map(SchemaNode::as_str).collect(),
        _ => Vec::new(),
    };

    if let Some(index) = types.iter().position(|name| *name == "null") {
        types.remove(index);
    }

    types.join(", ")
}

/// Accumulates records during one walk of a document.
struct Flattener {
    metadata: Arc<ExtensionMetadata>,
    document: Arc<str>,
    max_depth: usize,
    records: Vec<FieldRecord>,
}

impl Flattener {
    fn walk(&mut self, node: &SchemaNode, path: &str, depth: usize) -> Result<(), IndexError> {
        if depth > self.max_depth {
            return Err(IndexError::SchemaTooDeep {
                extension: self.metadata.id.clone(),
                document: self.document.to_string(),
                limit: self.max_depth,
            });
        }

        match node {
            SchemaNode::Array(items) => {
                for item in items {
                    self.walk(item, path, depth + 1)?;
                }
            }
            SchemaNode::Object(entries) => {
                self.promote(node, path);
                for (key, child) in entries {
                    self.walk(child, &child_path(path, key), depth + 1)?;
                }
            }
            SchemaNode::Scalar(_) => {}
        }

        Ok(())
    }

    /// Emit a record for `node` if it has a string title or description.
    fn promote(&mut self, node: &SchemaNode, path: &str) {
        let title = node.str_field("title");
        let description = node.str_field("description");
        if title.is_none() && description.is_none() {
            return;
        }

        self.records.push(FieldRecord {
            title: title.map(escape_text),
            description: description.map(render_markdown),
            extension: Arc::clone(&self.metadata),
            schema: Arc::clone(&self.document),
            path: path.to_string(),
            type_name: normalize_type(node),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::SafeHtml;
    use assert2::{check, let_assert};
    use rstest::rstest;
    use serde_json::json;

    fn metadata() -> Arc<ExtensionMetadata> {
        Arc::new(ExtensionMetadata {
            id: "bids".to_string(),
            version: "v1.1.5".to_string(),
            name: "Bid statistics and details".to_string(),
        })
    }

    fn flatten_json(value: serde_json::Value) -> Vec<FieldRecord> {
        flatten(&metadata(), "release-schema.json", "", &SchemaNode::from(value)).unwrap()
    }

    fn paths(records: &[FieldRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[rstest]
    #[case("", "properties", "")]
    #[case("tender", "properties", "tender")]
    #[case("", "definitions", "")]
    #[case("Bid", "definitions", "Bid.definitions")]
    #[case("", "tender", "tender")]
    #[case("tender", "items", "tender.items")]
    fn test_child_path(#[case] parent: &str, #[case] key: &str, #[case] expected: &str) {
        check!(child_path(parent, key) == expected);
    }

    #[test]
    fn test_properties_omitted_from_path() {
        let records = flatten_json(json!({"properties": {"foo": {"title": "A"}}}));
        check!(paths(&records) == ["foo"]);
    }

    #[test]
    fn test_root_definitions_omitted_nested_kept() {
        let records = flatten_json(json!({
            "definitions": {
                "Bar": {
                    "title": "B",
                    "definitions": {"Baz": {"title": "C"}}
                }
            }
        }));
        check!(paths(&records) == ["Bar", "Bar.definitions.Baz"]);
    }

    #[test]
    fn test_array_elements_share_parent_path() {
        let records = flatten_json(json!({
            "properties": {
                "value": {
                    "oneOf": [{"title": "First"}, {"description": "Second"}]
                }
            }
        }));
        check!(paths(&records) == ["value.oneOf", "value.oneOf"]);
        check!(records[0].title.as_ref().map(SafeHtml::text) == Some("First"));
        check!(records[1].title.is_none());
    }

    #[rstest]
    #[case(json!({"type": ["string", "null"]}), "string")]
    #[case(json!({"type": "null"}), "")]
    #[case(json!({"type": ["null", "integer", "null"]}), "integer, null")]
    #[case(json!({"type": ["object", "array"]}), "object, array")]
    #[case(json!({"type": "string"}), "string")]
    #[case(json!({"type": ""}), "")]
    #[case(json!({"type": false}), "")]
    #[case(json!({}), "")]
    fn test_normalize_type(#[case] value: serde_json::Value, #[case] expected: &str) {
        check!(normalize_type(&SchemaNode::from(value)) == expected);
    }

    #[test]
    fn test_numeric_title_not_promoted_but_children_walked() {
        let records = flatten_json(json!({
            "title": 5,
            "properties": {"child": {"title": "Child"}}
        }));
        check!(paths(&records) == ["child"]);
    }

    #[test]
    fn test_record_fields() {
        let records = flatten_json(json!({
            "properties": {
                "tender": {
                    "properties": {
                        "numberOfTenderers": {
                            "title": "Number of tenderers",
                            "description": "The *count* of bids.",
                            "type": ["integer", "null"]
                        }
                    }
                }
            }
        }));
        let_assert!([record] = records.as_slice());
        check!(record.path == "tender.numberOfTenderers");
        check!(record.type_name == "integer");
        check!(&*record.schema == "release-schema.json");
        check!(record.extension.id == "bids");
        let_assert!(Some(description) = &record.description);
        check!(description.as_html() == "<p>The <em>count</em> of bids.</p>\n");
    }

    #[test]
    fn test_title_markup_is_escaped() {
        let records = flatten_json(json!({
            "properties": {"lead": {"title": "<img src=x onerror=alert(1)>"}}
        }));
        let_assert!([record] = records.as_slice());
        let_assert!(Some(title) = &record.title);
        check!(title.as_html() == "&lt;img src=x onerror=alert(1)&gt;");
        check!(title.text() == "<img src=x onerror=alert(1)>");

        let json = serde_json::to_value(record).unwrap();
        check!(json["title"] == "&lt;img src=x onerror=alert(1)&gt;");
    }

    #[test]
    fn test_output_follows_key_order() {
        let node: SchemaNode = serde_json::from_str(
            r#"{"properties": {"zeta": {"title": "Z"}, "alpha": {"title": "A"}}}"#,
        )
        .unwrap();
        let records = flatten(&metadata(), "release-schema.json", "", &node).unwrap();
        check!(paths(&records) == ["zeta", "alpha"]);
    }

    #[test]
    fn test_scalar_root_is_empty() {
        check!(flatten_json(json!("just a string")).is_empty());
        check!(flatten_json(json!(null)).is_empty());
    }

    #[test]
    fn test_no_recognized_keys_terminates_empty() {
        let records = flatten_json(json!({"a": {"b": [{"c": [1, 2, {"d": true}]}]}}));
        check!(records.is_empty());
    }

    #[test]
    fn test_depth_guard() {
        let mut value = json!({"title": "leaf"});
        for _ in 0..20 {
            value = json!({"nested": value});
        }
        let node = SchemaNode::from(value);

        let result = flatten_with_limit(&metadata(), "release-schema.json", "", &node, 10);
        let_assert!(Err(IndexError::SchemaTooDeep { limit, .. }) = result);
        check!(limit == 10);

        let records = flatten_with_limit(&metadata(), "release-schema.json", "", &node, 64).unwrap();
        check!(records.len() == 1);
        check!(records[0].path.split('.').count() == 20);
    }
}

//! Schema-driven completion proposals.
//!
//! Works on a `CompletionContext`: the resolved node decides between
//! property-name proposals (keys, objects, a property before its `:`) and
//! value proposals (values, a property after its `:`, array items).

use std::collections::HashSet;

use lsp_types::{CompletionItem, CompletionItemKind, Documentation, MarkupContent, MarkupKind};
use regex::Regex;
use serde_json::Value;

use super::normalize::{CompletionContext, PLACEHOLDER_KEY};
use crate::schema::{AdditionalProperties, ResolvedSchema, SchemaNode};
use crate::yaml::{Document, NodeId, NodeKind};

const MAX_COMBINATOR_DEPTH: usize = 8;

enum Target<'d> {
    /// Keys of an object; `typing` is the key under the cursor.
    PropertyNames { object: Option<NodeId>, typing: Option<&'d str> },
    /// Value of a property that has none yet.
    MissingValue { object: NodeId, key: &'d str },
    /// An existing value node.
    Value(NodeId),
}

pub fn collect_completions(ctx: &CompletionContext, schema: &ResolvedSchema) -> Vec<CompletionItem> {
    let Some(doc) = ctx.stream.document_at(ctx.offset).or_else(|| {
        ctx.stream
            .documents()
            .iter()
            .find(|doc| doc.root().is_none())
    }) else {
        return Vec::new();
    };

    let mut proposals = Proposals::default();
    match classify(doc, ctx.offset) {
        Some(Target::PropertyNames { object, typing }) => {
            property_names(doc, object, typing, schema, ctx.offset, &mut proposals);
        }
        Some(Target::MissingValue { object, key }) => {
            for object_schema in object_schemas(doc, Some(object), schema, ctx.offset) {
                for property_schema in property_schemas(object_schema, key) {
                    values_of(property_schema, schema, &mut proposals, 0);
                }
            }
        }
        Some(Target::Value(node)) => {
            let matches = doc.matching_schemas(schema, doc.node(node).start);
            for entry in matches.iter().filter(|m| m.node == node && !m.inverted) {
                values_of(entry.schema, schema, &mut proposals, 0);
            }
        }
        None => {}
    }
    proposals.items
}

fn classify(doc: &Document, offset: usize) -> Option<Target<'_>> {
    if doc.root().is_none() {
        return Some(Target::PropertyNames {
            object: None,
            typing: None,
        });
    }
    let id = doc.node_at_inclusive(offset)?;
    let node = doc.node(id);
    match &node.kind {
        NodeKind::Object { .. } => Some(Target::PropertyNames {
            object: Some(id),
            typing: None,
        }),
        NodeKind::String { value, is_key: true } => {
            let object = doc.parent(id).and_then(|property| doc.parent(property))?;
            Some(Target::PropertyNames {
                object: Some(object),
                typing: Some(value.as_str()),
            })
        }
        NodeKind::Property { key, value } => {
            let object = doc.parent(id)?;
            let key_node = doc.node(*key);
            if offset <= key_node.end {
                return Some(Target::PropertyNames {
                    object: Some(object),
                    typing: doc.string_value(*key),
                });
            }
            match value {
                Some(value) => Some(Target::Value(*value)),
                None => Some(Target::MissingValue {
                    object,
                    key: doc.string_value(*key)?,
                }),
            }
        }
        // Between items: no node to complete.
        NodeKind::Array { .. } => None,
        _ => Some(Target::Value(id)),
    }
}

/// Schemas matched against `object` (or the root schema for an empty
/// document).
fn object_schemas<'s>(
    doc: &Document,
    object: Option<NodeId>,
    schema: &'s ResolvedSchema,
    offset: usize,
) -> Vec<&'s SchemaNode> {
    match object {
        Some(object) => doc
            .matching_schemas(schema, offset)
            .into_iter()
            .filter(|m| m.node == object && !m.inverted)
            .map(|m| m.schema)
            .collect(),
        None => schema.resolve(&schema.schema).into_iter().collect(),
    }
}

fn property_names(
    doc: &Document,
    object: Option<NodeId>,
    typing: Option<&str>,
    schema: &ResolvedSchema,
    offset: usize,
    proposals: &mut Proposals,
) {
    let present: HashSet<&str> = match object.map(|o| &doc.node(o).kind) {
        Some(NodeKind::Object { properties }) => properties.iter().filter_map(|p| doc.key_of(*p)).collect(),
        _ => HashSet::new(),
    };

    for object_schema in object_schemas(doc, object, schema, offset) {
        for (name, property) in object_schema.properties.iter().flatten() {
            if name == PLACEHOLDER_KEY || (present.contains(name.as_str()) && typing != Some(name.as_str())) {
                continue;
            }
            let property = schema.resolve(property).unwrap_or(property);
            let documentation = property
                .markdown_description
                .clone()
                .or_else(|| property.description.as_deref().map(super::markdown::to_markdown));
            proposals.push(CompletionItem {
                label: name.clone(),
                kind: Some(CompletionItemKind::PROPERTY),
                insert_text: Some(format!("{name}: ")),
                documentation: documentation.map(markdown),
                ..Default::default()
            });
        }
    }
}

/// Schemas that apply to property `key` of an object matching `object_schema`.
fn property_schemas<'s>(object_schema: &'s SchemaNode, key: &str) -> Vec<&'s SchemaNode> {
    if let Some(property) = object_schema.property(key) {
        return vec![property];
    }
    let by_pattern: Vec<&SchemaNode> = object_schema
        .pattern_properties
        .iter()
        .flatten()
        .filter(|(pattern, _)| Regex::new(pattern).map(|re| re.is_match(key)).unwrap_or(false))
        .map(|(_, schema)| schema)
        .collect();
    if !by_pattern.is_empty() {
        return by_pattern;
    }
    match &object_schema.additional_properties {
        Some(AdditionalProperties::Schema(schema)) => vec![schema.as_ref()],
        _ => Vec::new(),
    }
}

fn values_of(schema: &SchemaNode, root: &ResolvedSchema, proposals: &mut Proposals, depth: usize) {
    if depth > MAX_COMBINATOR_DEPTH {
        return;
    }
    let Some(schema) = root.resolve(schema) else {
        return;
    };

    if let Some(values) = &schema.enum_values {
        for (index, value) in values.iter().enumerate() {
            let documentation = schema
                .markdown_enum_descriptions
                .as_ref()
                .and_then(|d| d.get(index).cloned())
                .or_else(|| {
                    schema
                        .enum_descriptions
                        .as_ref()
                        .and_then(|d| d.get(index))
                        .map(|d| super::markdown::to_markdown(d))
                });
            proposals.push_value(value, CompletionItemKind::ENUM_MEMBER, documentation);
        }
    }
    if let Some(value) = &schema.const_value {
        proposals.push_value(value, CompletionItemKind::CONSTANT, None);
    }
    if let Some(value) = &schema.default {
        proposals.push_value(value, CompletionItemKind::VALUE, None);
    }
    if schema.schema_type.as_ref().is_some_and(|t| t.contains("boolean")) {
        proposals.push_value(&Value::Bool(true), CompletionItemKind::VALUE, None);
        proposals.push_value(&Value::Bool(false), CompletionItemKind::VALUE, None);
    }

    let combinators = [&schema.all_of, &schema.any_of, &schema.one_of];
    for branch in combinators.into_iter().flatten().flatten() {
        values_of(branch, root, proposals, depth + 1);
    }
}

fn markdown(value: String) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    })
}

#[derive(Default)]
struct Proposals {
    seen: HashSet<String>,
    items: Vec<CompletionItem>,
}

impl Proposals {
    fn push(&mut self, item: CompletionItem) {
        if self.seen.insert(item.label.clone()) {
            self.items.push(item);
        }
    }

    fn push_value(&mut self, value: &Value, kind: CompletionItemKind, documentation: Option<String>) {
        let label = match value {
            Value::String(s) => s.clone(),
            Value::Object(_) | Value::Array(_) => return,
            other => other.to_string(),
        };
        self.push(CompletionItem {
            label: label.clone(),
            kind: Some(kind),
            insert_text: Some(label),
            documentation: documentation.map(markdown),
            ..Default::default()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::normalize::{build_completion_context, LineTerminator};
    use crate::text::TextDocument;

    const SCHEMA: &str = r#"{
        "properties": {
            "name": {"type": "string", "description": "Package name"},
            "private": {"type": "boolean"},
            "license": {"enum": ["MIT", "Apache-2.0"], "enumDescriptions": ["permissive", "patent grant"]},
            "stability": {"anyOf": [{"const": "stable"}, {"const": "dev"}]},
            "level": {"type": "integer", "default": 3},
            "authors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {"name": {"type": "string"}, "email": {"type": "string"}}
                }
            }
        }
    }"#;

    fn labels(text: &str, offset: usize) -> Vec<String> {
        let schema = ResolvedSchema::new(SchemaNode::from_json(SCHEMA).unwrap());
        let document = TextDocument::new("file:///test.yaml", text);
        let ctx = build_completion_context(&document, document.position_at(offset), LineTerminator::CrLf).unwrap();
        collect_completions(&ctx, &schema)
            .into_iter()
            .map(|item| item.label)
            .collect()
    }

    #[test]
    fn blank_document_proposes_root_properties() {
        let found = labels("", 0);
        assert!(found.contains(&"name".to_string()));
        assert!(found.contains(&"authors".to_string()));
        assert!(!found.contains(&PLACEHOLDER_KEY.to_string()));
    }

    #[test]
    fn present_keys_are_not_proposed_again() {
        let found = labels("name: x\n", 8);
        assert!(!found.contains(&"name".to_string()));
        assert!(found.contains(&"license".to_string()));
    }

    #[test]
    fn key_being_typed_is_still_proposed() {
        let found = labels("na", 2);
        assert!(found.contains(&"name".to_string()));
    }

    #[test]
    fn enum_values_for_missing_value() {
        assert_eq!(labels("license: ", 9), vec!["MIT", "Apache-2.0"]);
    }

    #[test]
    fn boolean_and_default_values() {
        assert_eq!(labels("private: ", 9), vec!["true", "false"]);
        assert_eq!(labels("level: ", 7), vec!["3"]);
    }

    #[test]
    fn combinator_branches_contribute_values() {
        assert_eq!(labels("stability: ", 11), vec!["stable", "dev"]);
    }

    #[test]
    fn existing_value_gets_value_proposals() {
        assert_eq!(labels("license: MI", 11), vec!["MIT", "Apache-2.0"]);
    }

    #[test]
    fn plain_string_value_has_no_proposals() {
        assert!(labels("name: ", 6).is_empty());
    }

    #[test]
    fn array_item_proposes_item_properties() {
        assert_eq!(labels("authors:\n  - ", 13), vec!["name", "email"]);
    }

    #[test]
    fn property_names_follow_declaration_order() {
        assert_eq!(
            labels("", 0),
            vec!["name", "private", "license", "stability", "level", "authors"]
        );
    }

    #[test]
    fn enum_descriptions_become_documentation() {
        let schema = ResolvedSchema::new(SchemaNode::from_json(SCHEMA).unwrap());
        let document = TextDocument::new("file:///test.yaml", "license: ");
        let ctx = build_completion_context(&document, document.position_at(9), LineTerminator::CrLf).unwrap();
        let items = collect_completions(&ctx, &schema);
        assert_eq!(items[0].documentation, Some(markdown("permissive".to_string())));
    }
}

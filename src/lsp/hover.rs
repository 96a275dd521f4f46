//! Schema documentation for the node under the cursor.

use std::sync::Arc;

use lsp_types::Position;
use serde_json::Value;
use tracing::debug;

use super::markdown::to_markdown;
use super::{HoverInfo, InfoContribution, ModeFlags};
use crate::schema::{ResolvedSchema, SchemaProvider, SchemaTransform};
use crate::text::TextDocument;
use crate::yaml::{Document, DocumentStream, NodeId, NodeType};

pub struct YamlHover {
    provider: Arc<dyn SchemaProvider>,
    contributions: Vec<Arc<dyn InfoContribution>>,
    transform: Option<Arc<dyn SchemaTransform>>,
}

impl YamlHover {
    pub fn new(provider: Arc<dyn SchemaProvider>) -> Self {
        Self {
            provider,
            contributions: Vec::new(),
            transform: None,
        }
    }

    pub fn add_contribution(&mut self, contribution: Arc<dyn InfoContribution>) {
        self.contributions.push(contribution);
    }

    pub fn set_transform(&mut self, transform: Option<Arc<dyn SchemaTransform>>) {
        self.transform = transform;
    }

    pub async fn do_hover(
        &self,
        document: &TextDocument,
        position: Position,
        stream: &DocumentStream,
        flags: ModeFlags,
    ) -> Option<HoverInfo> {
        let offset = document.offset_at(position);
        let doc = stream.document_at(offset)?;
        let hovered = doc.node_at(offset)?;
        let node = doc.node(hovered);

        // Between the delimiters of a collection, not on a child.
        if matches!(node.node_type(), NodeType::Object | NodeType::Array)
            && offset > node.start + 1
            && offset + 1 < node.end
        {
            return None;
        }

        let target = if node.is_key() {
            let property = doc.parent(hovered)?;
            doc.property(property)?.1?
        } else {
            hovered
        };
        let range = Some(document.range(node.start, node.end));

        let path = doc.path_of(target);
        for contribution in self.contributions.iter().rev() {
            if let Some(contents) = contribution.info_contribution(document.uri(), &path).await {
                debug!(uri = document.uri(), "hover answered by contribution");
                return Some(HoverInfo { contents, range });
            }
        }

        let Some(schema) = self.provider.schema_for_resource(document.uri()).await else {
            debug!(uri = document.uri(), "no schema for hover");
            return None;
        };
        let schema = match (&self.transform, flags.transform_schema) {
            (Some(transform), true) => Arc::new(ResolvedSchema::new(transform.transform(schema.schema.clone()))),
            _ => schema,
        };

        let content = resolve_hover_content(doc, target, &schema)?;
        Some(HoverInfo {
            contents: vec![content],
            range,
        })
    }
}

/// Markdown documentation for `node` from the schemas that match it:
/// title, description and enum-value description, separated by blank
/// lines. `None` when the schemas document nothing.
pub fn resolve_hover_content(doc: &Document, node: NodeId, schema: &ResolvedSchema) -> Option<String> {
    let value = doc.value_of(node);
    let mut title: Option<&str> = None;
    let mut description: Option<String> = None;
    let mut enum_line: Option<(&Value, String)> = None;

    let matches = doc.matching_schemas(schema, doc.node(node).start);
    for entry in matches.iter().filter(|m| m.node == node && !m.inverted) {
        let s = entry.schema;
        if title.is_none() {
            title = s.title.as_deref().filter(|t| !t.is_empty());
        }
        if description.is_none() {
            description = s
                .markdown_description
                .clone()
                .filter(|d| !d.is_empty())
                .or_else(|| s.description.as_deref().filter(|d| !d.is_empty()).map(to_markdown));
        }
        if enum_line.is_none() {
            let Some(values) = &s.enum_values else {
                continue;
            };
            let Some(index) = values.iter().position(|v| *v == value) else {
                continue;
            };
            let markdown = s
                .markdown_enum_descriptions
                .as_ref()
                .and_then(|d| d.get(index))
                .filter(|d| !d.is_empty())
                .cloned();
            let text = markdown.or_else(|| {
                s.enum_descriptions
                    .as_ref()
                    .and_then(|d| d.get(index))
                    .filter(|d| !d.is_empty())
                    .map(|d| to_markdown(d))
            });
            enum_line = text.map(|t| (&values[index], t));
        }
    }

    let mut parts = Vec::new();
    if let Some(title) = title {
        parts.push(to_markdown(title));
    }
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        parts.push(description);
    }
    if let Some((value, text)) = enum_line {
        let literal = match value {
            Value::String(s) => to_markdown(s),
            other => to_markdown(&other.to_string()),
        };
        parts.push(format!("`{literal}`: {text}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

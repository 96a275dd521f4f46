//! Document outline — one symbol per property, flattened.

use std::str::FromStr;

use lsp_types::{Location, SymbolInformation, SymbolKind, Uri};
use tracing::warn;

use crate::text::TextDocument;
use crate::yaml::{Document, DocumentStream, NodeId, NodeKind, NodeType};

/// A property in the outline, with offsets instead of positions.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineSymbol {
    pub name: String,
    pub kind: SymbolKind,
    pub start: usize,
    pub end: usize,
    /// Dot-joined keys of the enclosing objects; array indices are skipped.
    pub container_name: Option<String>,
}

pub fn symbol_kind(node_type: NodeType) -> SymbolKind {
    match node_type {
        NodeType::Object => SymbolKind::MODULE,
        NodeType::String => SymbolKind::STRING,
        NodeType::Number => SymbolKind::NUMBER,
        NodeType::Array => SymbolKind::ARRAY,
        NodeType::Boolean => SymbolKind::BOOLEAN,
        NodeType::Null | NodeType::Property => SymbolKind::VARIABLE,
    }
}

/// Symbols of every sub-document, in stream order. `None` for an empty
/// stream.
pub fn extract_symbols(stream: &DocumentStream) -> Option<Vec<OutlineSymbol>> {
    if stream.is_empty() {
        return None;
    }
    let mut symbols = Vec::new();
    for doc in stream.documents() {
        if let Some(root) = doc.root() {
            collect(doc, root, None, &mut symbols);
        }
    }
    Some(symbols)
}

fn collect(doc: &Document, node: NodeId, container: Option<&str>, out: &mut Vec<OutlineSymbol>) {
    match &doc.node(node).kind {
        NodeKind::Array { items } => {
            for item in items {
                collect(doc, *item, container, out);
            }
        }
        NodeKind::Object { properties } => {
            for property in properties {
                let Some((key, Some(value))) = doc.property(*property) else {
                    continue;
                };
                let name = doc.string_value(key).unwrap_or_default();
                let span = doc.node(*property);
                out.push(OutlineSymbol {
                    name: name.to_string(),
                    kind: symbol_kind(doc.node(value).node_type()),
                    start: span.start,
                    end: span.end,
                    container_name: container.map(str::to_string),
                });
                let child_container = match container {
                    Some(container) => format!("{container}.{name}"),
                    None => name.to_string(),
                };
                collect(doc, value, Some(&child_container), out);
            }
        }
        _ => {}
    }
}

/// Outline as LSP symbols located in `document`.
#[allow(deprecated)]
pub fn find_document_symbols(document: &TextDocument, stream: &DocumentStream) -> Option<Vec<SymbolInformation>> {
    let symbols = extract_symbols(stream)?;
    let uri = match Uri::from_str(document.uri()) {
        Ok(uri) => uri,
        Err(e) => {
            warn!(uri = document.uri(), "cannot build symbol locations: {e}");
            return None;
        }
    };
    Some(
        symbols
            .into_iter()
            .map(|symbol| SymbolInformation {
                name: symbol.name,
                kind: symbol.kind,
                tags: None,
                deprecated: None,
                location: Location::new(uri.clone(), document.range(symbol.start, symbol.end)),
                container_name: symbol.container_name,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse;

    #[test]
    fn symbols_per_sub_document() {
        let symbols = extract_symbols(&parse("---\na: 1\n...\n---\nb: 2\n...\n")).unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(symbols.iter().all(|s| s.container_name.is_none()));
        assert!(symbols.iter().all(|s| s.kind == SymbolKind::NUMBER));
    }

    #[test]
    fn container_names_skip_array_indices() {
        let text = "node1:\n  node2:\n    - node3: x\n      node4:\n        deep: true\n";
        let symbols = extract_symbols(&parse(text)).unwrap();
        let view: Vec<_> = symbols
            .iter()
            .map(|s| (s.name.as_str(), s.container_name.as_deref(), s.kind))
            .collect();
        assert_eq!(
            view,
            vec![
                ("node1", None, SymbolKind::MODULE),
                ("node2", Some("node1"), SymbolKind::ARRAY),
                ("node3", Some("node1.node2"), SymbolKind::STRING),
                ("node4", Some("node1.node2"), SymbolKind::MODULE),
                ("deep", Some("node1.node2.node4"), SymbolKind::BOOLEAN),
            ]
        );
    }

    #[test]
    fn properties_without_values_are_skipped() {
        let symbols = extract_symbols(&parse("a:\nb: null\n")).unwrap();
        let view: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(view, vec![("b", SymbolKind::VARIABLE)]);
    }

    #[test]
    fn empty_stream_has_no_outline() {
        assert!(extract_symbols(&parse("")).is_none());
    }

    #[test]
    fn kind_mapping_is_total() {
        assert_eq!(symbol_kind(NodeType::Object), SymbolKind::MODULE);
        assert_eq!(symbol_kind(NodeType::Array), SymbolKind::ARRAY);
        assert_eq!(symbol_kind(NodeType::String), SymbolKind::STRING);
        assert_eq!(symbol_kind(NodeType::Number), SymbolKind::NUMBER);
        assert_eq!(symbol_kind(NodeType::Boolean), SymbolKind::BOOLEAN);
        assert_eq!(symbol_kind(NodeType::Null), SymbolKind::VARIABLE);
        assert_eq!(symbol_kind(NodeType::Property), SymbolKind::VARIABLE);
    }

    #[test]
    fn lsp_symbols_carry_ranges() {
        let document = TextDocument::new("file:///test.yaml", "a:\n  b: 1\n");
        let stream = parse(document.text());
        let symbols = find_document_symbols(&document, &stream).unwrap();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[1].name, "b");
        assert_eq!(symbols[1].container_name.as_deref(), Some("a"));
        assert_eq!(symbols[1].location.range.start, lsp_types::Position::new(1, 2));
    }
}

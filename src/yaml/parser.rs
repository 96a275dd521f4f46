//! Best-effort YAML parser that keeps byte spans.
//!
//! Covers the block structure editors see in configuration files: document
//! markers, block mappings and sequences, plain and quoted scalars,
//! single-line flow collections and `|`/`>` block scalars. Anything it does
//! not understand becomes a `SyntaxError` on the document while the rest of
//! the tree is still built. Parsing never fails.

use super::{Document, DocumentStream, NodeId, NodeKind};
use crate::text::line_offsets;

/// Parse a text buffer into one `Document` per `---`/`...` delimited part.
pub fn parse(text: &str) -> DocumentStream {
    let mut documents = Vec::new();
    let mut current: Option<Vec<Line>> = None;

    for mut line in split_lines(text) {
        let content = &text[line.content..line.end];
        if line.indent() == 0 && is_marker(content, "---") {
            if let Some(lines) = current.take() {
                documents.push(parse_document(text, lines));
            }
            let mut lines = Vec::new();
            // `--- value` puts the root on the marker line
            let rest = skip_spaces(text, line.start + 3, line.end);
            if strip_comment(text, rest, line.end) > rest {
                line.content = rest;
                lines.push(line);
            }
            current = Some(lines);
        } else if line.indent() == 0 && is_marker(content, "...") {
            if let Some(lines) = current.take() {
                documents.push(parse_document(text, lines));
            }
        } else if current.is_none() && content.starts_with('%') {
            // directive
        } else {
            match current.as_mut() {
                Some(lines) => lines.push(line),
                None if line.is_blank(text) => {}
                None => current = Some(vec![line]),
            }
        }
    }
    if let Some(lines) = current {
        documents.push(parse_document(text, lines));
    }

    DocumentStream::new(documents)
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// First non-space byte; moved forward when a line carries an inline node.
    content: usize,
    /// End of line content, terminator excluded.
    end: usize,
}

impl Line {
    fn indent(&self) -> usize {
        self.content - self.start
    }

    fn is_blank(&self, text: &str) -> bool {
        self.content >= self.end || text.as_bytes()[self.content] == b'#'
    }
}

fn split_lines(text: &str) -> Vec<Line> {
    let bytes = text.as_bytes();
    let starts = line_offsets(text);
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let mut end = starts.get(i + 1).copied().unwrap_or(text.len());
            while end > start && matches!(bytes[end - 1], b'\n' | b'\r') {
                end -= 1;
            }
            Line {
                start,
                content: skip_spaces(text, start, end),
                end,
            }
        })
        .collect()
}

fn is_marker(content: &str, marker: &str) -> bool {
    content == marker
        || (content.starts_with(marker)
            && matches!(content.as_bytes().get(marker.len()), Some(b' ' | b'\t')))
}

fn is_sequence_entry(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

fn skip_spaces(text: &str, mut pos: usize, end: usize) -> usize {
    let bytes = text.as_bytes();
    while pos < end && matches!(bytes[pos], b' ' | b'\t') {
        pos += 1;
    }
    pos
}

fn trim_end(text: &str, start: usize, mut end: usize) -> usize {
    let bytes = text.as_bytes();
    while end > start && matches!(bytes[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    end
}

/// End of `[start, end)` once a trailing `# comment` and spaces are removed.
fn strip_comment(text: &str, start: usize, end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < end {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(b'"') if b == b'\\' => i += 1,
            Some(_) => {}
            None if (b == b'"' || b == b'\'') && (i == start || bytes[i - 1] == b' ') => {
                quote = Some(b)
            }
            None if b == b'#' && (i == start || matches!(bytes[i - 1], b' ' | b'\t')) => {
                return trim_end(text, start, i);
            }
            None => {}
        }
        i += 1;
    }
    trim_end(text, start, end)
}

/// Byte index (relative to `content`) of the `:` separating a block key
/// from its value.
fn find_mapping_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let mut i = 0;
    match bytes.first() {
        Some(b'[' | b'{') | None => return None,
        Some(&q @ (b'"' | b'\'')) => {
            i = closing_quote(bytes, 0, q)? + 1;
        }
        _ => {}
    }
    while i < bytes.len() {
        match bytes[i] {
            b'#' if i > 0 && matches!(bytes[i - 1], b' ' | b'\t') => return None,
            b':' if matches!(bytes.get(i + 1), None | Some(b' ' | b'\t')) => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the quote closing the one at `open`.
fn closing_quote(bytes: &[u8], open: usize, quote: u8) -> Option<usize> {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 1,
            b'\'' if quote == b'\'' && bytes.get(i + 1) == Some(&b'\'') => i += 1,
            b if b == quote => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Type a scalar with the YAML core schema.
fn decode_scalar(raw: &str, plain: bool) -> NodeKind {
    if plain && raw.is_empty() {
        return NodeKind::Null;
    }
    let fallback = || NodeKind::String {
        value: if plain { raw.to_string() } else { unquote(raw) },
        is_key: false,
    };
    match serde_yaml::from_str::<serde_yaml::Value>(raw) {
        Ok(serde_yaml::Value::Null) if plain => NodeKind::Null,
        Ok(serde_yaml::Value::Bool(b)) if plain => NodeKind::Boolean(b),
        Ok(serde_yaml::Value::Number(n)) if plain => {
            let number = if let Some(i) = n.as_i64() {
                Some(serde_json::Number::from(i))
            } else if let Some(u) = n.as_u64() {
                Some(serde_json::Number::from(u))
            } else {
                n.as_f64().and_then(serde_json::Number::from_f64)
            };
            number.map(NodeKind::Number).unwrap_or_else(fallback)
        }
        Ok(serde_yaml::Value::String(value)) => NodeKind::String {
            value,
            is_key: false,
        },
        _ => fallback(),
    }
}

fn decode_key(raw: &str) -> String {
    if raw.starts_with('"') || raw.starts_with('\'') {
        match serde_yaml::from_str::<String>(raw) {
            Ok(key) => key,
            Err(_) => unquote(raw),
        }
    } else {
        raw.to_string()
    }
}

fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix(['"', '\''])
        .unwrap_or(raw);
    inner.strip_suffix(['"', '\'']).unwrap_or(inner).to_string()
}

fn parse_document(text: &str, lines: Vec<Line>) -> Document {
    let mut parser = BlockParser {
        text,
        lines,
        pos: 0,
        doc: Document::default(),
    };
    let root = parser.parse_block(None, 0);
    while let Some(line) = parser.peek() {
        parser
            .doc
            .push_error("Unexpected content after document root", line.content, line.end);
        parser.pos += 1;
    }
    parser.doc.set_root(root);
    parser.doc
}

struct BlockParser<'a> {
    text: &'a str,
    lines: Vec<Line>,
    pos: usize,
    doc: Document,
}

impl<'a> BlockParser<'a> {
    /// Next line with content, skipping blank and comment lines.
    fn peek(&mut self) -> Option<Line> {
        while let Some(line) = self.lines.get(self.pos) {
            if !line.is_blank(self.text) {
                return Some(*line);
            }
            self.pos += 1;
        }
        None
    }

    fn content(&self, line: &Line) -> &'a str {
        &self.text[line.content..line.end]
    }

    fn parse_block(&mut self, parent: Option<NodeId>, min_indent: usize) -> Option<NodeId> {
        let line = self.peek()?;
        if line.indent() < min_indent {
            return None;
        }
        let content = self.content(&line);
        if is_sequence_entry(content) {
            Some(self.parse_sequence(parent, line.indent()))
        } else if find_mapping_colon(content).is_some() {
            Some(self.parse_mapping(parent, line.indent()))
        } else {
            self.pos += 1;
            let end = strip_comment(self.text, line.content, line.end);
            let first = self.text.as_bytes().get(line.content).copied();
            match first {
                Some(style @ (b'|' | b'>')) => {
                    Some(self.parse_block_scalar(parent, line.indent().saturating_sub(1), line.content, style))
                }
                _ => Some(self.parse_inline(parent, line.content, end)),
            }
        }
    }

    fn parse_mapping(&mut self, parent: Option<NodeId>, indent: usize) -> NodeId {
        let start = self.lines[self.pos].content;
        let object = self.doc.alloc(NodeKind::Object { properties: Vec::new() }, start, start, parent);
        let mut properties = Vec::new();

        while let Some(line) = self.peek() {
            if line.indent() < indent {
                break;
            }
            if line.indent() > indent {
                self.doc.push_error("Unexpected indentation", line.content, line.end);
                self.pos += 1;
                continue;
            }
            if is_sequence_entry(self.content(&line)) {
                break;
            }
            properties.push(self.parse_entry(object, line, indent));
        }

        let end = properties
            .last()
            .map(|p| self.doc.node(*p).end)
            .unwrap_or(start);
        let node = self.doc.node_mut(object);
        node.end = end;
        node.kind = NodeKind::Object { properties };
        object
    }

    fn parse_entry(&mut self, object: NodeId, line: Line, indent: usize) -> NodeId {
        self.pos += 1;
        let content = self.content(&line);
        let Some(colon) = find_mapping_colon(content).map(|c| c + line.content) else {
            let end = strip_comment(self.text, line.content, line.end);
            let property = self.alloc_property(object, line.content, end);
            self.doc.push_error("Missing ':' after mapping key", line.content, end);
            return property;
        };

        let key_end = trim_end(self.text, line.content, colon);
        let property = self.alloc_property(object, line.content, key_end);
        self.doc.node_mut(property).end = colon + 1;

        let value_start = skip_spaces(self.text, colon + 1, line.end);
        let value_end = strip_comment(self.text, value_start, line.end);
        let value = if value_start < value_end {
            match self.text.as_bytes()[value_start] {
                style @ (b'|' | b'>') => {
                    Some(self.parse_block_scalar(Some(property), indent, value_start, style))
                }
                first => {
                    let value = self.parse_inline(Some(property), value_start, value_end);
                    if !matches!(first, b'"' | b'\'' | b'[' | b'{') {
                        self.fold_plain_continuation(value, indent);
                    }
                    Some(value)
                }
            }
        } else {
            match self.peek() {
                Some(next) if next.indent() > indent => self.parse_block(Some(property), next.indent()),
                Some(next) if next.indent() == indent && is_sequence_entry(self.content(&next)) => {
                    Some(self.parse_sequence(Some(property), indent))
                }
                _ => None,
            }
        };

        if let Some(value) = value {
            let value_end = self.doc.node(value).end;
            let node = self.doc.node_mut(property);
            node.end = value_end;
            if let NodeKind::Property { value: slot, .. } = &mut node.kind {
                *slot = Some(value);
            }
        }
        property
    }

    /// Property whose key spans `[start, key_end)`, with no value yet.
    fn alloc_property(&mut self, object: NodeId, start: usize, key_end: usize) -> NodeId {
        let key = self.doc.alloc(
            NodeKind::String {
                value: decode_key(&self.text[start..key_end]),
                is_key: true,
            },
            start,
            key_end,
            None,
        );
        let property = self
            .doc
            .alloc(NodeKind::Property { key, value: None }, start, key_end, Some(object));
        self.doc.node_mut(key).parent = Some(property);
        property
    }

    /// Join more-indented lines that continue a plain scalar.
    fn fold_plain_continuation(&mut self, value: NodeId, indent: usize) {
        let mut folded = self.text[self.doc.node(value).start..self.doc.node(value).end].to_string();
        let mut end = None;
        while let Some(line) = self.peek() {
            if line.indent() <= indent {
                break;
            }
            let line_end = strip_comment(self.text, line.content, line.end);
            folded.push(' ');
            folded.push_str(&self.text[line.content..line_end]);
            end = Some(line_end);
            self.pos += 1;
        }
        if let Some(end) = end {
            let node = self.doc.node_mut(value);
            node.end = end;
            node.kind = NodeKind::String {
                value: folded,
                is_key: false,
            };
        }
    }

    fn parse_sequence(&mut self, parent: Option<NodeId>, indent: usize) -> NodeId {
        let start = self.lines[self.pos].content;
        let array = self.doc.alloc(NodeKind::Array { items: Vec::new() }, start, start, parent);
        let mut items = Vec::new();

        while let Some(line) = self.peek() {
            if line.indent() > indent {
                self.doc.push_error("Unexpected indentation", line.content, line.end);
                self.pos += 1;
                continue;
            }
            if line.indent() < indent || !is_sequence_entry(self.content(&line)) {
                break;
            }
            let dash = line.content;
            let item_start = skip_spaces(self.text, dash + 1, line.end);
            let item = if strip_comment(self.text, item_start, line.end) > item_start {
                // Parse the rest of the line as a node sitting at its own column.
                self.lines[self.pos].content = item_start;
                self.parse_block(Some(array), item_start - line.start)
            } else {
                self.pos += 1;
                match self.peek() {
                    Some(next) if next.indent() > indent => {
                        self.parse_block(Some(array), next.indent())
                    }
                    _ => None,
                }
            };
            items.push(item.unwrap_or_else(|| {
                self.doc.alloc(NodeKind::Null, dash + 1, dash + 1, Some(array))
            }));
        }

        let end = items.last().map(|i| self.doc.node(*i).end).unwrap_or(start);
        let node = self.doc.node_mut(array);
        node.end = end;
        node.kind = NodeKind::Array { items };
        array
    }

    /// `|` / `>` scalar whose header sits at `header`; content lines must be
    /// indented deeper than `indent`.
    fn parse_block_scalar(&mut self, parent: Option<NodeId>, indent: usize, header: usize, style: u8) -> NodeId {
        let text = self.text;
        let header_end = text[header..].find(['\n', '\r']).map_or(text.len(), |i| header + i);
        let mut end = strip_comment(text, header, header_end);
        let mut parts: Vec<&str> = Vec::new();
        let mut block_indent = None;

        while let Some(line) = self.lines.get(self.pos).copied() {
            if line.content >= line.end {
                parts.push("");
                self.pos += 1;
                continue;
            }
            if line.indent() <= indent {
                break;
            }
            let column = *block_indent.get_or_insert(line.indent());
            parts.push(&text[line.start + column.min(line.indent())..line.end]);
            end = line.end;
            self.pos += 1;
        }
        while parts.last() == Some(&"") {
            parts.pop();
        }

        let mut value = if style == b'|' {
            parts.join("\n")
        } else {
            parts.join(" ")
        };
        if !value.is_empty() {
            value.push('\n');
        }
        self.doc
            .alloc(NodeKind::String { value, is_key: false }, header, end, parent)
    }

    /// Scalar or flow collection occupying `[start, end)` of one line.
    fn parse_inline(&mut self, parent: Option<NodeId>, start: usize, end: usize) -> NodeId {
        let mut cursor = start;
        let node = self.parse_flow_value(parent, &mut cursor, end, false);
        let rest = skip_spaces(self.text, cursor, end);
        if rest < end {
            self.doc.push_error("Unexpected characters after value", rest, end);
        }
        node
    }

    fn parse_flow_value(&mut self, parent: Option<NodeId>, cursor: &mut usize, end: usize, in_flow: bool) -> NodeId {
        let text = self.text;
        let bytes = text.as_bytes();
        *cursor = skip_spaces(self.text, *cursor, end);
        let start = *cursor;
        match bytes.get(start).filter(|_| start < end) {
            Some(b'[') => self.parse_flow_sequence(parent, cursor, end),
            Some(b'{') => self.parse_flow_mapping(parent, cursor, end),
            Some(&quote @ (b'"' | b'\'')) => {
                let close = closing_quote(&bytes[..end], start, quote);
                *cursor = match close {
                    Some(close) => close + 1,
                    None => {
                        self.doc.push_error("Unterminated quoted scalar", start, end);
                        end
                    }
                };
                let kind = decode_scalar(&text[start..*cursor], false);
                self.doc.alloc(kind, start, *cursor, parent)
            }
            _ => {
                while *cursor < end && !(in_flow && matches!(bytes[*cursor], b',' | b']' | b'}')) {
                    *cursor += 1;
                }
                let token_end = trim_end(text, start, *cursor);
                let kind = decode_scalar(&text[start..token_end], true);
                self.doc.alloc(kind, start, token_end, parent)
            }
        }
    }

    fn parse_flow_sequence(&mut self, parent: Option<NodeId>, cursor: &mut usize, end: usize) -> NodeId {
        let start = *cursor;
        let array = self.doc.alloc(NodeKind::Array { items: Vec::new() }, start, start, parent);
        let mut items = Vec::new();
        *cursor += 1;

        loop {
            *cursor = skip_spaces(self.text, *cursor, end);
            if *cursor >= end {
                self.doc.push_error("Missing ']' to close flow sequence", start, end);
                break;
            }
            if self.text.as_bytes()[*cursor] == b']' {
                *cursor += 1;
                break;
            }
            items.push(self.parse_flow_value(Some(array), cursor, end, true));
            self.flow_separator(cursor, end, b']');
        }

        let node = self.doc.node_mut(array);
        node.end = *cursor;
        node.kind = NodeKind::Array { items };
        array
    }

    fn parse_flow_mapping(&mut self, parent: Option<NodeId>, cursor: &mut usize, end: usize) -> NodeId {
        let text = self.text;
        let bytes = text.as_bytes();
        let start = *cursor;
        let object = self.doc.alloc(NodeKind::Object { properties: Vec::new() }, start, start, parent);
        let mut properties = Vec::new();
        *cursor += 1;

        loop {
            *cursor = skip_spaces(self.text, *cursor, end);
            if *cursor >= end {
                self.doc.push_error("Missing '}' to close flow mapping", start, end);
                break;
            }
            if bytes[*cursor] == b'}' {
                *cursor += 1;
                break;
            }

            let key_start = *cursor;
            match bytes[key_start] {
                quote @ (b'"' | b'\'') => {
                    *cursor = closing_quote(&bytes[..end], key_start, quote).map_or(end, |c| c + 1);
                }
                _ => {
                    while *cursor < end
                        && !matches!(bytes[*cursor], b',' | b'}')
                        && !(bytes[*cursor] == b':'
                            && matches!(bytes.get(*cursor + 1), None | Some(b' ' | b',' | b'}')))
                    {
                        *cursor += 1;
                    }
                }
            }
            let key_end = trim_end(text, key_start, *cursor);
            let property = self.alloc_property(object, key_start, key_end);

            *cursor = skip_spaces(text, *cursor, end);
            if *cursor < end && bytes[*cursor] == b':' {
                *cursor += 1;
                self.doc.node_mut(property).end = *cursor;
                let value = self.parse_flow_value(Some(property), cursor, end, true);
                let value_end = self.doc.node(value).end;
                let node = self.doc.node_mut(property);
                node.end = value_end.max(node.end);
                if let NodeKind::Property { value: slot, .. } = &mut node.kind {
                    *slot = Some(value);
                }
            }
            properties.push(property);
            self.flow_separator(cursor, end, b'}');
        }

        let node = self.doc.node_mut(object);
        node.end = *cursor;
        node.kind = NodeKind::Object { properties };
        object
    }

    /// Consume the `,` after a flow entry, leaving the closing bracket in place.
    fn flow_separator(&mut self, cursor: &mut usize, end: usize, close: u8) {
        *cursor = skip_spaces(self.text, *cursor, end);
        match self.text.as_bytes().get(*cursor).filter(|_| *cursor < end) {
            Some(b',') => *cursor += 1,
            Some(&b) if b == close => {}
            None => {}
            Some(_) => {
                let width = self.text[*cursor..].chars().next().map_or(1, char::len_utf8);
                self.doc.push_error(
                    format!("Expected ',' or '{}'", close as char),
                    *cursor,
                    *cursor + width,
                );
                *cursor += width;
            }
        }
    }
}

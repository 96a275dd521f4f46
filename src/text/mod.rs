//! Byte offset and line/column conversion.
//!
//! Offsets are UTF-8 byte offsets into the document text. A `Position`
//! column counts bytes from the start of its line.

use lsp_types::Position;

/// Compute the offset of every line start. The first entry is always 0.
///
/// `\n`, `\r\n` and a lone `\r` all end a line.
pub fn line_offsets(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut offsets = vec![0];
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
                offsets.push(i + 1);
            }
            b'\n' => offsets.push(i + 1),
            _ => {}
        }
        i += 1;
    }
    offsets
}

/// Line-start table for one text buffer.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        Self {
            line_starts: line_offsets(text),
            len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_starts(&self) -> &[usize] {
        &self.line_starts
    }

    /// Offset of the first byte of `line`.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line).copied()
    }

    /// Exclusive end of `line`, including its terminator: the next line's
    /// start, or the text length for the last line.
    pub fn line_end(&self, line: usize) -> Option<usize> {
        if line >= self.line_count() {
            return None;
        }
        Some(self.line_starts.get(line + 1).copied().unwrap_or(self.len))
    }

    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        let Some(line_start) = self.line_start(line) else {
            return self.len;
        };
        let next_line_start = self.line_end(line).unwrap_or(self.len);
        (line_start + position.character as usize)
            .min(next_line_start)
            .max(line_start)
    }

    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.len);
        // Number of line starts <= offset; at least 1 because line 0 starts at 0.
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        Position::new(line as u32, (offset - self.line_starts[line]) as u32)
    }
}

/// A text buffer addressed by resource URI.
#[derive(Debug, Clone)]
pub struct TextDocument {
    uri: String,
    text: String,
    index: LineIndex,
}

impl TextDocument {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let index = LineIndex::new(&text);
        Self {
            uri: uri.into(),
            text,
            index,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Like `LineIndex::offset_at`, moved back to a character boundary.
    pub fn offset_at(&self, position: Position) -> usize {
        let mut offset = self.index.offset_at(position);
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    pub fn position_at(&self, offset: usize) -> Position {
        self.index.position_at(offset)
    }

    /// Convert a half-open offset range to an LSP range.
    pub fn range(&self, start: usize, end: usize) -> lsp_types::Range {
        lsp_types::Range::new(self.position_at(start), self.position_at(end))
    }
}

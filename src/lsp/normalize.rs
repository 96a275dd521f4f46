//! Completion context — make a half-typed line parseable.
//!
//! While a user types, the cursor line is usually not a complete
//! `key: value` pair, so the tree has no node there. The line is replaced by
//! a synthetic one (`partial:` or `PLACEHOLDER_KEY:`) and the rest of the
//! buffer is re-appended verbatim. Columns up to the cursor are unchanged,
//! so the original offset can be resolved against the spliced text.

use lsp_types::Position;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::text::TextDocument;
use crate::yaml::{parse, DocumentStream};

/// Key inserted on blank lines. Never offered as a completion.
pub const PLACEHOLDER_KEY: &str = "__completion_placeholder__";

/// Line terminator used when splitting the edited line from what follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    #[default]
    CrLf,
    Lf,
}

impl LineTerminator {
    pub fn as_str(self) -> &'static str {
        match self {
            LineTerminator::CrLf => "\r\n",
            LineTerminator::Lf => "\n",
        }
    }

    pub fn width(self) -> usize {
        self.as_str().len()
    }

    fn terminates(self, line: &str) -> Option<&str> {
        let content = line.strip_suffix(self.as_str())?;
        match self {
            LineTerminator::Lf if content.ends_with('\r') => None,
            _ => Some(content),
        }
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("line {line} does not end with the configured {expected:?} line terminator")]
    TerminatorMismatch { line: u32, expected: LineTerminator },
}

pub type NormalizeResult<T> = Result<T, NormalizeError>;

/// Tree and lookup offset to use for a completion request.
#[derive(Debug)]
pub struct CompletionContext {
    /// Text that was parsed: the original, or the spliced substitute.
    pub text: String,
    pub stream: DocumentStream,
    /// Offset to resolve the completion node at.
    pub offset: usize,
    pub spliced: bool,
}

pub fn build_completion_context(
    document: &TextDocument,
    position: Position,
    terminator: LineTerminator,
) -> NormalizeResult<CompletionContext> {
    let text = document.text();
    let index = document.line_index();
    let position = document.position_at(document.offset_at(position));
    let line = position.line as usize;
    let start = index.line_start(line).unwrap_or(text.len());
    let end = index.line_end(line).unwrap_or(text.len());
    let raw = &text[start..end];

    if raw.contains(':') {
        let adjusted = Position::new(position.line, position.character.saturating_sub(1));
        return Ok(CompletionContext {
            text: text.to_string(),
            stream: parse(text),
            offset: document.offset_at(adjusted),
            spliced: false,
        });
    }

    let is_last = line + 1 >= index.line_count();
    let content = if is_last {
        raw
    } else {
        match terminator.terminates(raw) {
            Some(content) => content,
            None => {
                warn!(
                    line = position.line,
                    expected = ?terminator,
                    "edited line does not end with the configured terminator, skipping completion"
                );
                return Err(NormalizeError::TerminatorMismatch {
                    line: position.line,
                    expected: terminator,
                });
            }
        }
    };

    let trimmed = content.trim();
    let mut spliced = String::with_capacity(text.len() + PLACEHOLDER_KEY.len() + 4);
    spliced.push_str(&text[..start + content.len()]);
    if trimmed.is_empty() || trimmed == "-" {
        // `-key:` would be a plain scalar, not a sequence entry.
        if content.ends_with('-') {
            spliced.push(' ');
        }
        spliced.push_str(PLACEHOLDER_KEY);
    }
    spliced.push(':');
    spliced.push_str(terminator.as_str());
    spliced.push_str(&text[end..]);

    let stream = parse(&spliced);
    Ok(CompletionContext {
        text: spliced,
        stream,
        offset: document.offset_at(position),
        spliced: true,
    })
}

//! In-process language intelligence — no JSON-RPC, no transport.
//!
//! Functions that operate directly on document text and a parsed
//! `DocumentStream`. Uses `lsp-types` for the standard data structures
//! (Diagnostic, CompletionList, SymbolInformation) without a server.
//!
//! The only suspension point is fetching the schema for a resource (and
//! asking hover contributions), so the service surface is async while
//! matching and rendering stay synchronous.

pub mod completion;
pub mod hover;
pub mod markdown;
pub mod normalize;
pub mod service;
pub mod symbols;
pub mod validation;

use async_trait::async_trait;
use lsp_types::{CompletionList, Diagnostic, Position, SymbolInformation};
use serde::Serialize;

use crate::yaml::PathSegment;

pub use service::YamlLanguageService;

/// Hover information for a position in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoverInfo {
    /// Markdown strings, in display order.
    pub contents: Vec<String>,
    /// Range of the node the hover applies to.
    pub range: Option<lsp_types::Range>,
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    /// Run the registered `SchemaTransform` before matching.
    pub transform_schema: bool,
}

/// Third-party hover provider. Consulted before the schema; the most
/// recently registered contribution that answers wins.
#[async_trait]
pub trait InfoContribution: Send + Sync {
    async fn info_contribution(&self, uri: &str, path: &[PathSegment]) -> Option<Vec<String>>;
}

/// In-process language service for one document format.
#[async_trait]
pub trait LanguageService {
    /// Compute diagnostics for the given content.
    async fn diagnostics(&self, uri: &str, content: &str) -> Vec<Diagnostic>;

    /// Compute completions at the given position.
    async fn completions(&self, uri: &str, content: &str, pos: Position) -> CompletionList;

    /// Compute hover information at the given position.
    async fn hover(&self, uri: &str, content: &str, pos: Position) -> Option<HoverInfo>;

    /// Flat outline of every property in the content.
    fn document_symbols(&self, uri: &str, content: &str) -> Vec<SymbolInformation>;
}

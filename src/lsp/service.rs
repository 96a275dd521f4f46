//! YAML language service — schema store, hover, completion, outline and
//! validation behind one handle.

use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{CompletionList, Diagnostic, Position, SymbolInformation};
use tracing::{debug, warn};

use super::completion::collect_completions;
use super::hover::YamlHover;
use super::normalize::build_completion_context;
use super::symbols::find_document_symbols;
use super::validation::diagnostics_for;
use super::{HoverInfo, InfoContribution, LanguageService, ModeFlags};
use crate::config::{LanguageSettings, SchemaAssociation};
use crate::schema::{SchemaError, SchemaNode, SchemaProvider, SchemaResult, SchemaStore, SchemaTransform};
use crate::text::TextDocument;
use crate::yaml::{parse, DocumentStream};

pub struct YamlLanguageService {
    store: Arc<SchemaStore>,
    hover: YamlHover,
    settings: LanguageSettings,
}

impl Default for YamlLanguageService {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlLanguageService {
    pub fn new() -> Self {
        let store = Arc::new(SchemaStore::new());
        let provider: Arc<dyn SchemaProvider> = store.clone();
        Self {
            store,
            hover: YamlHover::new(provider),
            settings: LanguageSettings::default(),
        }
    }

    pub fn settings(&self) -> &LanguageSettings {
        &self.settings
    }

    pub fn schema_store(&self) -> &SchemaStore {
        &self.store
    }

    pub fn mode_flags(&self) -> ModeFlags {
        ModeFlags {
            transform_schema: self.settings.transform_schema,
        }
    }

    /// Apply new settings and re-register every schema association.
    ///
    /// Associations that fail to load are skipped with a warning; the first
    /// failure is returned once the others are registered.
    pub async fn configure(&mut self, settings: LanguageSettings) -> SchemaResult<()> {
        self.store.clear_external_schemas().await;
        let mut first_error = None;
        for association in &settings.schemas {
            if let Err(e) = self.register(association).await {
                warn!(uri = %association.uri, "skipping schema association: {e}");
                first_error.get_or_insert(e);
            }
        }
        self.settings = settings;
        first_error.map_or(Ok(()), Err)
    }

    async fn register(&self, association: &SchemaAssociation) -> SchemaResult<()> {
        match (&association.schema, &association.path) {
            (Some(inline), _) => {
                let schema = SchemaNode::from_value(inline.clone())?;
                self.store
                    .register_external_schema(&association.uri, &association.file_match, schema)
                    .await
            }
            (None, Some(path)) => {
                self.store
                    .register_schema_file(&association.uri, &association.file_match, path)
                    .await
            }
            (None, None) => Err(SchemaError::MissingContent(association.uri.clone())),
        }
    }

    pub fn register_contribution(&mut self, contribution: Arc<dyn InfoContribution>) {
        self.hover.add_contribution(contribution);
    }

    pub fn set_schema_transform(&mut self, transform: Arc<dyn SchemaTransform>) {
        self.hover.set_transform(Some(transform));
    }

    pub async fn do_hover(&self, document: &TextDocument, position: Position, stream: &DocumentStream) -> Option<HoverInfo> {
        self.hover.do_hover(document, position, stream, self.mode_flags()).await
    }

    /// Completion at `position`, normalizing the edited line first.
    pub async fn do_complete(&self, document: &TextDocument, position: Position) -> CompletionList {
        let mut list = CompletionList {
            is_incomplete: false,
            items: Vec::new(),
        };
        let ctx = match build_completion_context(document, position, self.settings.line_terminator) {
            Ok(ctx) => ctx,
            Err(e) => {
                debug!("no completion context: {e}");
                return list;
            }
        };
        let Some(schema) = self.store.schema_for_resource(document.uri()).await else {
            return list;
        };
        list.items = collect_completions(&ctx, &schema);
        list
    }

    pub async fn do_validation(&self, document: &TextDocument, stream: &DocumentStream) -> Vec<Diagnostic> {
        let schema = if self.settings.validate {
            self.store.schema_for_resource(document.uri()).await
        } else {
            None
        };
        diagnostics_for(document, stream, schema.as_deref())
    }

    pub fn find_document_symbols(&self, document: &TextDocument, stream: &DocumentStream) -> Vec<SymbolInformation> {
        find_document_symbols(document, stream).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageService for YamlLanguageService {
    async fn diagnostics(&self, uri: &str, content: &str) -> Vec<Diagnostic> {
        let document = TextDocument::new(uri, content);
        let stream = parse(content);
        self.do_validation(&document, &stream).await
    }

    async fn completions(&self, uri: &str, content: &str, pos: Position) -> CompletionList {
        self.do_complete(&TextDocument::new(uri, content), pos).await
    }

    async fn hover(&self, uri: &str, content: &str, pos: Position) -> Option<HoverInfo> {
        let document = TextDocument::new(uri, content);
        let stream = parse(content);
        self.do_hover(&document, pos, &stream).await
    }

    fn document_symbols(&self, uri: &str, content: &str) -> Vec<SymbolInformation> {
        let document = TextDocument::new(uri, content);
        let stream = parse(content);
        self.find_document_symbols(&document, &stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::normalize::LineTerminator;
    use serde_json::json;

    fn settings(schema: serde_json::Value) -> LanguageSettings {
        LanguageSettings {
            schemas: vec![SchemaAssociation {
                uri: "inline://test".into(),
                file_match: vec!["*.yaml".into()],
                path: None,
                schema: Some(schema),
            }],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn configure_registers_inline_schemas() {
        let mut service = YamlLanguageService::new();
        service
            .configure(settings(json!({"properties": {"cwd": {"description": "Working dir"}}})))
            .await
            .unwrap();
        let hover = service
            .hover("file:///x.yaml", "cwd: test", Position::new(0, 1))
            .await
            .unwrap();
        assert_eq!(hover.contents, vec!["Working dir".to_string()]);
        assert!(service.hover("file:///x.json", "cwd: test", Position::new(0, 1)).await.is_none());
    }

    #[tokio::test]
    async fn configure_reports_associations_without_content() {
        let mut service = YamlLanguageService::new();
        let mut settings = settings(json!({}));
        settings.schemas.push(SchemaAssociation {
            uri: "remote://only".into(),
            file_match: vec!["*".into()],
            path: None,
            schema: None,
        });
        let err = service.configure(settings).await.unwrap_err();
        assert!(matches!(err, SchemaError::MissingContent(uri) if uri == "remote://only"));
        assert_eq!(service.schema_store().len().await, 1);
    }

    #[tokio::test]
    async fn validation_can_be_disabled() {
        let mut service = YamlLanguageService::new();
        let mut settings = settings(json!({"additionalProperties": false}));
        service.configure(settings.clone()).await.unwrap();
        assert_eq!(service.diagnostics("file:///x.yaml", "a: 1").await.len(), 1);

        settings.validate = false;
        service.configure(settings).await.unwrap();
        assert!(service.diagnostics("file:///x.yaml", "a: 1").await.is_empty());
    }

    #[tokio::test]
    async fn completion_respects_line_terminator_setting() {
        let mut service = YamlLanguageService::new();
        let mut settings = settings(json!({"properties": {"name": {}, "email": {}, "role": {}}}));
        service.configure(settings.clone()).await.unwrap();
        let text = "name: a\n\nemail: b\n";
        let list = service.completions("file:///x.yaml", text, Position::new(1, 0)).await;
        assert!(list.items.is_empty());

        settings.line_terminator = LineTerminator::Lf;
        service.configure(settings).await.unwrap();
        let list = service.completions("file:///x.yaml", text, Position::new(1, 0)).await;
        let labels: Vec<_> = list.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["role"]);
    }

    #[tokio::test]
    async fn symbols_through_the_trait() {
        let service = YamlLanguageService::new();
        let symbols = service.document_symbols("file:///x.yaml", "a:\n  b: 1\n");
        assert_eq!(symbols.len(), 2);
        assert!(service.document_symbols("file:///x.yaml", "").is_empty());
    }
}

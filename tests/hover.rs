//! Hover against the bowerrc schema fixture.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use yaml_intel::config::{LanguageSettings, SchemaAssociation};
use yaml_intel::lsp::{HoverInfo, InfoContribution, YamlLanguageService};
use yaml_intel::schema::{SchemaNode, SchemaTransform};
use yaml_intel::text::TextDocument;
use yaml_intel::yaml::{parse, PathSegment};

const URI: &str = "file:///home/user/project/test.yaml";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

async fn bowerrc_service() -> YamlLanguageService {
    let mut service = YamlLanguageService::new();
    let settings = LanguageSettings {
        schemas: vec![SchemaAssociation {
            uri: "http://json.schemastore.org/bowerrc".into(),
            file_match: vec!["*.yml".into(), "*.yaml".into()],
            path: Some(fixture("bowerrc.json")),
            schema: None,
        }],
        ..Default::default()
    };
    service.configure(settings).await.unwrap();
    service
}

async fn hover_at(service: &YamlLanguageService, text: &str, offset: usize) -> Option<HoverInfo> {
    let document = TextDocument::new(URI, text);
    let stream = parse(text);
    service.do_hover(&document, document.position_at(offset), &stream).await
}

#[tokio::test]
async fn hover_on_root_key() {
    let service = bowerrc_service().await;
    let hover = hover_at(&service, "cwd: test", 1).await.unwrap();
    assert_eq!(hover.contents.len(), 1);
    assert!(hover.contents[0].starts_with("Current working directory \\- the directory"));
    // Single line breaks become paragraphs.
    assert!(hover.contents[0].contains("run\\.\n\nAll relative paths"));
}

#[tokio::test]
async fn hover_on_root_value() {
    let service = bowerrc_service().await;
    let key = hover_at(&service, "cwd: test", 1).await.unwrap();
    let value = hover_at(&service, "cwd: test", 6).await.unwrap();
    assert_eq!(key.contents, value.contents);
}

#[tokio::test]
async fn key_and_value_with_depth_share_content() {
    let service = bowerrc_service().await;
    let text = "scripts:\n  postinstall: test";
    let key = hover_at(&service, text, 15).await.unwrap();
    let value = hover_at(&service, text, 26).await.unwrap();
    assert_eq!(key.contents, vec!["Runs after components are installed\\.".to_string()]);
    assert_eq!(key.contents, value.contents);
}

#[tokio::test]
async fn hover_range_is_the_hovered_node() {
    let service = bowerrc_service().await;
    let text = "scripts:\n  postinstall: test";
    let key = hover_at(&service, text, 15).await.unwrap();
    let range = key.range.unwrap();
    assert_eq!((range.start.line, range.start.character), (1, 2));
    assert_eq!((range.end.line, range.end.character), (1, 13));

    let value = hover_at(&service, text, 26).await.unwrap();
    let range = value.range.unwrap();
    assert_eq!((range.start.character, range.end.character), (15, 19));
}

#[tokio::test]
async fn root_and_child_keys_both_hover() {
    let service = bowerrc_service().await;
    let text = "scripts:\n  postinstall: test";
    let root = hover_at(&service, text, 3).await.unwrap();
    assert_eq!(root.contents, vec!["Hooks run around install and uninstall\\.".to_string()]);
    assert!(hover_at(&service, text, 15).await.is_some());
}

#[tokio::test]
async fn undocumented_property_has_no_hover() {
    let service = bowerrc_service().await;
    assert!(hover_at(&service, "analytics: true", 3).await.is_none());
}

#[tokio::test]
async fn hover_in_second_sub_document() {
    let service = bowerrc_service().await;
    let text = "---\nanalytics: true\n...\n---\njson: test\n...";
    let hover = hover_at(&service, text, 30).await.unwrap();
    assert_eq!(hover.contents, vec!["A file path to the Bower configuration file".to_string()]);
}

#[tokio::test]
async fn separator_text_has_no_hover() {
    let service = bowerrc_service().await;
    let text = "---\nanalytics: true\n...\n---\njson: test\n...";
    assert!(hover_at(&service, text, 21).await.is_none());
}

#[tokio::test]
async fn interior_of_flow_collections_has_no_hover() {
    let mut service = YamlLanguageService::new();
    let settings = LanguageSettings {
        schemas: vec![SchemaAssociation {
            uri: "inline://list".into(),
            file_match: vec!["*.yaml".into()],
            path: None,
            schema: Some(serde_json::json!({
                "description": "root",
                "properties": {"list": {"description": "a list"}, "map": {"description": "a map"}}
            })),
        }],
        ..Default::default()
    };
    service.configure(settings).await.unwrap();

    let text = "list: [1,   2]\nmap: {a: 1,   b: 2}\n";
    // On a delimiter: hover for the collection itself.
    assert!(hover_at(&service, text, 6).await.is_some());
    // Whitespace between items, inside the brackets.
    assert!(hover_at(&service, text, 10).await.is_none());
    let brace = text.find('{').unwrap();
    assert!(hover_at(&service, text, brace + 6).await.is_none());
    assert!(hover_at(&service, text, brace).await.is_some());
}

#[tokio::test]
async fn enum_value_line() {
    let mut service = YamlLanguageService::new();
    let settings = LanguageSettings {
        schemas: vec![SchemaAssociation {
            uri: "inline://enum".into(),
            file_match: vec!["*.yaml".into()],
            path: None,
            schema: Some(serde_json::json!({
                "properties": {"mode": {"enum": ["a", "b"], "enumDescriptions": ["A", "B"]}}
            })),
        }],
        ..Default::default()
    };
    service.configure(settings).await.unwrap();
    let hover = hover_at(&service, "mode: b", 6).await.unwrap();
    assert!(hover.contents[0].contains("`b`: B"));
}

struct Fixed(&'static str);

#[async_trait]
impl InfoContribution for Fixed {
    async fn info_contribution(&self, _uri: &str, _path: &[PathSegment]) -> Option<Vec<String>> {
        Some(vec![self.0.to_string()])
    }
}

struct ScriptsOnly;

#[async_trait]
impl InfoContribution for ScriptsOnly {
    async fn info_contribution(&self, _uri: &str, path: &[PathSegment]) -> Option<Vec<String>> {
        match path.first() {
            Some(PathSegment::Key(key)) if key == "scripts" => Some(vec![format!("{} segments", path.len())]),
            _ => None,
        }
    }
}

#[tokio::test]
async fn latest_contribution_wins() {
    let mut service = bowerrc_service().await;
    service.register_contribution(Arc::new(Fixed("first")));
    service.register_contribution(Arc::new(Fixed("second")));
    let hover = hover_at(&service, "cwd: test", 1).await.unwrap();
    assert_eq!(hover.contents, vec!["second".to_string()]);
}

#[tokio::test]
async fn declining_contribution_falls_through() {
    let mut service = bowerrc_service().await;
    service.register_contribution(Arc::new(Fixed("fallback")));
    service.register_contribution(Arc::new(ScriptsOnly));

    let text = "cwd: x\nscripts:\n  postinstall: test";
    let scripts = hover_at(&service, text, text.find("postinstall").unwrap()).await.unwrap();
    assert_eq!(scripts.contents, vec!["2 segments".to_string()]);
    let cwd = hover_at(&service, text, 1).await.unwrap();
    assert_eq!(cwd.contents, vec!["fallback".to_string()]);
}

struct Retitle;

impl SchemaTransform for Retitle {
    fn transform(&self, mut schema: SchemaNode) -> SchemaNode {
        if let Some(cwd) = schema.properties.as_mut().and_then(|p| p.get_mut("cwd")) {
            cwd.title = Some("Transformed".into());
        }
        schema
    }
}

#[tokio::test]
async fn schema_transform_applies_only_when_enabled() {
    let mut service = bowerrc_service().await;
    service.set_schema_transform(Arc::new(Retitle));
    let plain = hover_at(&service, "cwd: test", 1).await.unwrap();
    assert!(!plain.contents[0].starts_with("Transformed"));

    let mut settings = service.settings().clone();
    settings.transform_schema = true;
    service.configure(settings).await.unwrap();
    let transformed = hover_at(&service, "cwd: test", 1).await.unwrap();
    assert!(transformed.contents[0].starts_with("Transformed\n\nCurrent working directory"));
}

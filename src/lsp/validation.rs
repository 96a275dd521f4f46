//! Syntax errors and schema problems as LSP diagnostics.

use lsp_types::{Diagnostic, DiagnosticSeverity};

use crate::schema::{ProblemKind, ResolvedSchema};
use crate::text::TextDocument;
use crate::yaml::DocumentStream;

const SOURCE: &str = "yaml";

/// Diagnostics for every sub-document of `stream`. Schema problems are
/// only reported when a schema is given.
pub fn diagnostics_for(document: &TextDocument, stream: &DocumentStream, schema: Option<&ResolvedSchema>) -> Vec<Diagnostic> {
    let mut diags = Vec::new();

    for doc in stream.documents() {
        for error in doc.errors() {
            diags.push(make_diag(document, error.start, error.end, &error.message, DiagnosticSeverity::ERROR));
        }
        let Some(schema) = schema else {
            continue;
        };
        for problem in doc.validate_schema(schema) {
            let severity = match problem.kind {
                ProblemKind::AdditionalProperty => DiagnosticSeverity::WARNING,
                _ => DiagnosticSeverity::ERROR,
            };
            diags.push(make_diag(document, problem.start, problem.end, &problem.message, severity));
        }
    }

    diags
}

fn make_diag(document: &TextDocument, start: usize, end: usize, message: &str, severity: DiagnosticSeverity) -> Diagnostic {
    Diagnostic {
        range: document.range(start, end),
        severity: Some(severity),
        source: Some(SOURCE.to_string()),
        message: message.to_string(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaNode;
    use crate::yaml::parse;
    use lsp_types::Position;

    fn diagnostics(text: &str, schema: Option<&str>) -> Vec<Diagnostic> {
        let schema = schema.map(|s| ResolvedSchema::new(SchemaNode::from_json(s).unwrap()));
        let document = TextDocument::new("file:///test.yaml", text);
        let stream = parse(text);
        diagnostics_for(&document, &stream, schema.as_ref())
    }

    #[test]
    fn valid_yaml_without_schema_is_clean() {
        assert!(diagnostics("a: 1\nb:\n  - x\n", None).is_empty());
    }

    #[test]
    fn syntax_errors_are_errors() {
        let diags = diagnostics("a: 1\njust text\n", None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diags[0].range.start, Position::new(1, 0));
    }

    #[test]
    fn unknown_property_is_a_warning() {
        let schema = r#"{"properties": {"a": {"type": "number"}}, "additionalProperties": false}"#;
        let diags = diagnostics("a: 1\nzzz: 2\n", Some(schema));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diags[0].range.start, Position::new(1, 0));
        assert_eq!(diags[0].range.end, Position::new(1, 3));
    }

    #[test]
    fn type_mismatch_points_at_value() {
        let schema = r#"{"properties": {"a": {"type": "number"}}}"#;
        let diags = diagnostics("a: text\n", Some(schema));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diags[0].range.start, Position::new(0, 3));
        assert!(diags[0].message.contains("number"));
    }

    #[test]
    fn every_sub_document_is_validated() {
        let schema = r#"{"required": ["name"]}"#;
        let diags = diagnostics("---\nname: a\n---\nother: b\n", Some(schema));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].range.start.line, 3);
    }
}

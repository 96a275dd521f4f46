use std::path::Path;
use std::process::Command;

use serde_json::Value;

const SCHEMA: &str = r#"{
  "type": "object",
  "required": ["name"],
  "properties": {
    "name": {"type": "string", "description": "Package name."},
    "private": {"type": "boolean"}
  }
}"#;

fn run(dir: &Path, args: &[&str]) -> Value {
    let output = Command::new(env!("CARGO_BIN_EXE_yaml-intel"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run yaml-intel");
    assert!(
        output.status.success(),
        "yaml-intel {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

fn workspace(document: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schema.json"), SCHEMA).unwrap();
    std::fs::write(dir.path().join("package.yaml"), document).unwrap();
    dir
}

#[test]
fn hover_prints_markdown_for_key() {
    let dir = workspace("name: demo\n");
    let hover = run(dir.path(), &["--schema", "schema.json", "hover", "package.yaml", "1"]);
    assert_eq!(hover["contents"][0], "Package name\\.");
    assert_eq!(hover["range"]["start"]["character"], 0);
    assert_eq!(hover["range"]["end"]["character"], 4);
}

#[test]
fn complete_lists_missing_properties() {
    let dir = workspace("name: demo\n");
    let list = run(dir.path(), &["--schema", "schema.json", "complete", "package.yaml", "11"]);
    let labels: Vec<_> = list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, vec!["private"]);
}

#[test]
fn symbols_without_schema() {
    let dir = workspace("name: demo\nprivate: true\n");
    let symbols = run(dir.path(), &["symbols", "package.yaml"]);
    let names: Vec<_> = symbols
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["name", "private"]);
}

#[test]
fn validate_reports_schema_problems() {
    let dir = workspace("private: maybe\n");
    let diagnostics = run(dir.path(), &["--schema", "schema.json", "validate", "package.yaml"]);
    let messages: Vec<_> = diagnostics
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["message"].as_str().unwrap().to_string())
        .collect();
    assert!(messages.contains(&"Missing property \"name\".".to_string()));
    assert!(messages.iter().any(|m| m.contains("boolean")));
}

#[test]
fn project_config_supplies_associations() {
    let dir = workspace("private: 1\n");
    let config_dir = dir.path().join(".yaml-intel");
    std::fs::create_dir(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.yaml"),
        "validate: false\nschemas:\n  - uri: file:///schema.json\n    fileMatch: [package.yaml]\n    path: ../schema.json\n",
    )
    .unwrap();
    let diagnostics = run(dir.path(), &["validate", "package.yaml"]);
    assert_eq!(diagnostics.as_array().unwrap().len(), 0);
}

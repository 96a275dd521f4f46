use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};

use yaml_intel::config::{LanguageSettings, SchemaAssociation};
use yaml_intel::lsp::YamlLanguageService;
use yaml_intel::text::TextDocument;
use yaml_intel::yaml::parse;

#[derive(Parser)]
#[command(name = "yaml-intel", about = "Schema-aware hover, completion, outline and validation for YAML.")]
struct Cli {
    /// Settings file (YAML or JSON). Defaults to .yaml-intel/config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON schema to apply to FILE, ahead of configured associations
    #[arg(short, long)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hover documentation at a byte offset
    Hover { file: PathBuf, offset: usize },
    /// Completion proposals at a byte offset
    Complete { file: PathBuf, offset: usize },
    /// Flat document outline
    Symbols { file: PathBuf },
    /// Syntax and schema diagnostics
    Validate { file: PathBuf },
}

impl Command {
    fn file(&self) -> &Path {
        match self {
            Command::Hover { file, .. }
            | Command::Complete { file, .. }
            | Command::Symbols { file }
            | Command::Validate { file } => file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("yaml_intel=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => LanguageSettings::load(path)?,
        None => LanguageSettings::load_project(&std::env::current_dir()?)?,
    };
    if let Some(schema) = &cli.schema {
        settings.schemas.insert(
            0,
            SchemaAssociation {
                uri: file_uri(schema)?,
                file_match: vec!["*".into()],
                path: Some(schema.clone()),
                schema: None,
            },
        );
    }

    let mut service = YamlLanguageService::new();
    service
        .configure(settings)
        .await
        .context("failed to register schema associations")?;

    let file = cli.command.file();
    let text = std::fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?;
    let document = TextDocument::new(file_uri(file)?, text);
    let stream = parse(document.text());
    debug!(uri = document.uri(), documents = stream.documents().len(), "parsed");

    match &cli.command {
        Command::Hover { offset, .. } => {
            let position = document.position_at(*offset);
            print_json(&service.do_hover(&document, position, &stream).await)?;
        }
        Command::Complete { offset, .. } => {
            let position = document.position_at(*offset);
            print_json(&service.do_complete(&document, position).await)?;
        }
        Command::Symbols { .. } => {
            print_json(&service.find_document_symbols(&document, &stream))?;
        }
        Command::Validate { .. } => {
            let diagnostics = service.do_validation(&document, &stream).await;
            info!("{} diagnostic(s) in {}", diagnostics.len(), file.display());
            print_json(&diagnostics)?;
        }
    }

    Ok(())
}

fn file_uri(path: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(path).with_context(|| format!("cannot resolve {}", path.display()))?;
    Ok(format!("file://{}", absolute.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

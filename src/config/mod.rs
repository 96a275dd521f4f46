//! Language settings — schema associations and behaviour switches.
//!
//! Project-level config: `.yaml-intel/config.yaml` (safe to commit).
//! An explicit file can be passed instead; YAML and JSON both load since
//! JSON is valid YAML.
//!
//! Relative schema paths resolve against the directory of the settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::lsp::normalize::LineTerminator;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read settings {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// One `fileMatch` → schema association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaAssociation {
    /// Identifier of the schema; also how it is reported in logs.
    pub uri: String,
    #[serde(default)]
    pub file_match: Vec<String>,
    /// Local schema file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Inline schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageSettings {
    /// Report schema problems as diagnostics.
    pub validate: bool,
    pub line_terminator: LineTerminator,
    /// Apply the registered schema transform before matching.
    pub transform_schema: bool,
    pub schemas: Vec<SchemaAssociation>,
}

impl Default for LanguageSettings {
    fn default() -> Self {
        Self {
            validate: true,
            line_terminator: LineTerminator::default(),
            transform_schema: false,
            schemas: Vec::new(),
        }
    }
}

impl LanguageSettings {
    /// Load settings from a YAML or JSON file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            settings.resolve_paths(base);
        }
        Ok(settings)
    }

    /// Load `.yaml-intel/config.yaml` under `dir`, or defaults when absent.
    pub fn load_project(dir: &Path) -> ConfigResult<Self> {
        let path = project_config_path(dir);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        for association in &mut self.schemas {
            if let Some(path) = association.path.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        }
    }
}

/// Path to the project-level settings file.
pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(".yaml-intel").join("config.yaml")
}

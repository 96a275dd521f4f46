//! JSON Schema model — the subset the language service reads.
//!
//! Vendor extensions used by editors (`markdownDescription`,
//! `markdownEnumDescriptions`, `enumDescriptions`) are explicit fields so
//! the "markdown variant first, escaped plain variant second" rule is a
//! plain `Option` chain.

pub mod matcher;
pub mod store;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use matcher::{Problem, ProblemKind, SchemaMatch};
pub use store::{SchemaProvider, SchemaStore, SchemaTransform};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid schema JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid fileMatch pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema '{0}' has neither inline content nor a local path")]
    MissingContent(String),
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// `type` is either one name or a list of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    One(String),
    Many(Vec<String>),
}

impl SchemaType {
    pub fn names(&self) -> Vec<&str> {
        match self {
            SchemaType::One(name) => vec![name.as_str()],
            SchemaType::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().contains(&name)
    }
}

/// `additionalProperties` may be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// `items` is a single schema for every element or a tuple of schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Single(Box<SchemaNode>),
    Tuple(Vec<SchemaNode>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "$id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_description: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<IndexMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Items>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaNode>>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_descriptions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_enum_descriptions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<IndexMap<String, SchemaNode>>,
    #[serde(rename = "$defs", skip_serializing_if = "Option::is_none")]
    pub defs: Option<IndexMap<String, SchemaNode>>,
}

impl SchemaNode {
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> SchemaResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Schema for property `name` declared directly on this node.
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties.as_ref()?.get(name)
    }

    /// Whether `type` admits `name` (an absent `type` admits everything).
    pub fn allows_type(&self, name: &str) -> bool {
        self.schema_type.as_ref().map_or(true, |t| t.contains(name))
    }
}

/// A schema ready for matching: the root plus `$ref` lookup.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub schema: SchemaNode,
}

impl ResolvedSchema {
    pub fn new(schema: SchemaNode) -> Self {
        Self { schema }
    }

    /// Follow `$ref` chains that point into this document.
    ///
    /// Supports `#`, `#/definitions/<name>` and `#/$defs/<name>`. Anything
    /// else resolves to `None`.
    pub fn resolve<'s>(&'s self, schema: &'s SchemaNode) -> Option<&'s SchemaNode> {
        let mut current = schema;
        // Bounded so self-referencing chains terminate.
        for _ in 0..32 {
            let Some(reference) = current.reference.as_deref() else {
                return Some(current);
            };
            current = self.lookup(reference)?;
        }
        None
    }

    fn lookup(&self, reference: &str) -> Option<&SchemaNode> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() || pointer == "/" {
            return Some(&self.schema);
        }
        let mut segments = pointer.trim_start_matches('/').split('/');
        let table = match segments.next()? {
            "definitions" => self.schema.definitions.as_ref()?,
            "$defs" => self.schema.defs.as_ref()?,
            _ => return None,
        };
        let name = unescape_pointer(segments.next()?);
        if segments.next().is_some() {
            return None;
        }
        table.get(&name)
    }
}

fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

//! Schema associations — which schema applies to which resource.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use glob::Pattern;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{ResolvedSchema, SchemaError, SchemaNode, SchemaResult};

/// Source of the schema applying to a resource.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn schema_for_resource(&self, uri: &str) -> Option<Arc<ResolvedSchema>>;
}

/// Rewrites a schema before it is matched (e.g. to adapt JSON-oriented
/// schemas to YAML conventions).
pub trait SchemaTransform: Send + Sync {
    fn transform(&self, schema: SchemaNode) -> SchemaNode;
}

struct Association {
    uri: String,
    patterns: Vec<Pattern>,
    schema: Arc<ResolvedSchema>,
}

impl Association {
    fn applies_to(&self, resource: &str) -> bool {
        let file_name = resource.rsplit('/').next().unwrap_or(resource);
        self.patterns
            .iter()
            .any(|p| p.matches(resource) || p.matches(file_name))
    }
}

/// In-memory association list, first registration wins.
#[derive(Default)]
pub struct SchemaStore {
    associations: RwLock<Vec<Association>>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `schema` (identified by `uri`) with resources matching any
    /// of the `file_match` globs.
    pub async fn register_external_schema(
        &self,
        uri: &str,
        file_match: &[String],
        schema: SchemaNode,
    ) -> SchemaResult<()> {
        let patterns = file_match
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|source| SchemaError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<SchemaResult<Vec<_>>>()?;

        info!(uri, patterns = file_match.len(), "registered schema association");
        self.associations.write().await.push(Association {
            uri: uri.to_string(),
            patterns,
            schema: Arc::new(ResolvedSchema::new(schema)),
        });
        Ok(())
    }

    /// Parse schema JSON from a file and register it.
    pub async fn register_schema_file(&self, uri: &str, file_match: &[String], path: &Path) -> SchemaResult<()> {
        let text = tokio::fs::read_to_string(path).await?;
        let schema = SchemaNode::from_json(&text)?;
        self.register_external_schema(uri, file_match, schema).await
    }

    pub async fn clear_external_schemas(&self) {
        self.associations.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.associations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.associations.read().await.is_empty()
    }
}

#[async_trait]
impl SchemaProvider for SchemaStore {
    async fn schema_for_resource(&self, uri: &str) -> Option<Arc<ResolvedSchema>> {
        let associations = self.associations.read().await;
        let found = associations.iter().find(|a| a.applies_to(uri));
        match found {
            Some(association) => {
                debug!(resource = uri, schema = %association.uri, "schema association found");
                Some(Arc::clone(&association.schema))
            }
            None => {
                debug!(resource = uri, "no schema association");
                None
            }
        }
    }
}

//! yaml-intel — schema-aware language intelligence for YAML.
//!
//! Parses YAML into a span-tracking node tree, matches nodes against JSON
//! Schema, and answers hover, completion, outline and validation requests
//! in-process.

pub mod config;
pub mod lsp;
pub mod schema;
pub mod text;
pub mod yaml;

//! Tool catalog: the static, read-only description of every tool an adapter exposes.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use rmcp::schemars::{self, JsonSchema};
use serde::Serialize;

use crate::error::AppError;

/// Description of a single callable tool.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    /// Globally unique tool name.
    pub name: &'static str,
    /// Human-readable description shown to clients.
    pub description: &'static str,
    /// Gerund phrase naming the operation, used in error envelopes
    /// (e.g. "searching records" → `Error searching records: ...`).
    pub operation: &'static str,
    /// JSON Schema of the tool arguments.
    pub input_schema: Arc<JsonObject>,
}

impl ToolDefinition {
    /// Creates a definition whose argument schema is derived from `P`.
    pub fn new<P: JsonSchema>(
        name: &'static str,
        description: &'static str,
        operation: &'static str,
    ) -> Self {
        let schema = schemars::schema_for!(P);
        let input_schema = serde_json::to_value(schema)
            .ok()
            .and_then(|value| value.as_object().cloned())
            .unwrap_or_default();

        Self {
            name,
            description,
            operation,
            input_schema: Arc::new(input_schema),
        }
    }

    /// Converts the definition into the MCP tool descriptor.
    pub fn to_tool(&self) -> Tool {
        Tool::new(self.name, self.description, self.input_schema.clone())
    }

    /// Converts the definition into a discovery listing entry.
    pub fn to_listing(&self) -> ToolListing {
        ToolListing {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema.as_ref().clone(),
        }
    }
}

/// A tool entry in the discovery / export document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub input_schema: JsonObject,
}

/// Immutable mapping from tool name to definition, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    definitions: Vec<ToolDefinition>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    /// Builds a catalog, failing if two definitions share a name.
    pub fn new(definitions: Vec<ToolDefinition>) -> Result<Self, AppError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            if index.insert(definition.name, position).is_some() {
                return Err(AppError::DuplicateTool(definition.name.to_string()));
            }
        }

        Ok(Self { definitions, index })
    }

    /// Looks up a definition by tool name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    /// Iterates definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.definitions.iter()
    }

    /// Capabilities manifest: tool name → description.
    pub fn manifest(&self) -> Vec<(&'static str, &'static str)> {
        self.definitions
            .iter()
            .map(|d| (d.name, d.description))
            .collect()
    }
}

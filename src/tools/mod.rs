//! Adapter-independent tool machinery: catalog, registry and argument helpers.

pub mod catalog;
pub mod pagination;
pub mod registry;

pub use catalog::{ToolCatalog, ToolDefinition, ToolListing};
pub use pagination::{validate_pagination, PaginationParams, ValidatedPagination};
pub use registry::{parse_arguments, ToolRegistry, ToolRegistryBuilder};

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

/// Argument type for tools that take no parameters.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct NoParams {}

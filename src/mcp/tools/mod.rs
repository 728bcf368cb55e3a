//! MCP tool implementations organized by adapter.

pub mod analytics;
pub mod crm;
pub mod graph;
pub mod graphql;

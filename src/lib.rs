//! mcp-adapters - MCP servers for external services
//!
//! Exposes a CRM REST API, arbitrary GraphQL endpoints, DuckDB / MotherDuck
//! and Neo4j as uniform catalogs of MCP tools.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod mcp;
pub mod render;
pub mod services;
pub mod tools;

//! Model Context Protocol (MCP) server implementation.
//!
//! ## Architecture
//!
//! Each adapter is a [`ToolRegistry`](crate::tools::ToolRegistry) built at
//! start-up by [`AdapterRuntime`] and served by [`McpServer`] over stdio,
//! streamable HTTP or the legacy SSE transport.
//!
//! ## Modules
//!
//! - `adapter`: adapter selection, registry construction and teardown
//! - `protocol`: response envelope helpers
//! - `server`: MCP server handler
//! - `sse`: legacy SSE + POST message transport
//! - `tools`: tool implementations organized by adapter

pub mod adapter;
pub mod protocol;
pub(crate) mod server;
pub mod sse;
pub mod tools;

pub use adapter::{Adapter, AdapterRuntime, HeaderRequirement, ToolDiscovery};
pub use server::McpServer;

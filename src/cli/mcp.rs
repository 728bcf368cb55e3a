//! MCP server command handler.

use color_eyre::Result;
use rmcp::ServiceExt;

use crate::mcp::{Adapter, McpServer};

use super::App;

impl App {
    /// Run the MCP server with stdio transport.
    pub async fn run_mcp(&self, adapter: Adapter) -> Result<()> {
        tracing::info!(%adapter, "Starting MCP server");

        let (_, runtime) = super::runtime(adapter)?;
        let server = McpServer::new(runtime.clone());

        let service = server.serve(rmcp::transport::stdio()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to start MCP server");
            color_eyre::eyre::eyre!("Failed to start MCP server: {}", e)
        })?;

        tracing::info!("MCP server started, waiting for connections");

        let result = service.waiting().await;
        runtime.shutdown().await;
        result.map_err(|e| {
            tracing::error!(error = %e, "MCP server error");
            color_eyre::eyre::eyre!("MCP server error: {}", e)
        })?;

        tracing::info!("MCP server shutting down");
        Ok(())
    }
}

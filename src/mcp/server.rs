//! MCP server handler shared by every transport.

use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};

use crate::context::InvocationContext;
use crate::mcp::adapter::AdapterRuntime;

/// MCP server exposing the tool registry of one adapter.
///
/// Cloning is cheap; HTTP transports create one instance per session.
#[derive(Clone)]
pub struct McpServer {
    runtime: Arc<AdapterRuntime>,
}

impl McpServer {
    pub fn new(runtime: Arc<AdapterRuntime>) -> Self {
        Self { runtime }
    }
}

/// Builds the invocation context from request metadata.
///
/// A context attached by the legacy SSE transport wins; otherwise headers
/// come from the HTTP request parts the streamable transport attaches. Over
/// stdio neither is present and the context is empty.
fn invocation_context(context: &RequestContext<RoleServer>) -> InvocationContext {
    if let Some(ctx) = context.extensions.get::<InvocationContext>() {
        return ctx.clone();
    }

    context
        .extensions
        .get::<http::request::Parts>()
        .map(|parts| InvocationContext::from_headers(&parts.headers))
        .unwrap_or_default()
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        let adapter = self.runtime.adapter();
        let mut server_info = Implementation::from_build_env();
        server_info.name = format!("mcp-adapters-{}", adapter);

        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info,
            instructions: Some(adapter.instructions().to_string()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self
            .runtime
            .registry()
            .catalog()
            .iter()
            .map(|d| d.to_tool())
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let ctx = invocation_context(&context);
        tracing::info!(
            adapter = %self.runtime.adapter(),
            tool = %request.name,
            authenticated = ctx.auth_token.is_some(),
            "Tool call"
        );

        let outcome = self
            .runtime
            .registry()
            .invoke(&request.name, request.arguments, ctx)
            .await?;
        Ok(outcome.into())
    }
}

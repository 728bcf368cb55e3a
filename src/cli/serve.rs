//! HTTP server command handler.
//!
//! Routes:
//! - `/mcp`: streamable HTTP transport (stateless)
//! - `/sse` + `/messages`: legacy SSE transport
//! - `GET /tools`: tool discovery listing
//! - `GET /health`: static status document

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use color_eyre::Result;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use serde_json::{json, Value};

use crate::context::bearer_token;
use crate::mcp::{sse, Adapter, AdapterRuntime, McpServer, ToolDiscovery};

use super::App;

const HEALTH_PATH: &str = "/health";

/// Authentication middleware: requires a bearer token on every route but `/health`.
///
/// The token itself is not checked here; it is the downstream credential.
async fn auth_middleware(req: Request, next: Next) -> Response {
    if req.uri().path() == HEALTH_PATH {
        return next.run(req).await;
    }

    let has_token = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .is_some();

    if has_token {
        next.run(req).await
    } else {
        tracing::debug!(path = %req.uri().path(), "Rejected request without bearer token");
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn health(State(runtime): State<Arc<AdapterRuntime>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "adapter": runtime.adapter(),
        "paths": {
            "mcp": "/mcp",
            "sse": "/sse",
            "messages": "/messages",
            "tools": "/tools",
            "health": HEALTH_PATH,
        },
    }))
}

async fn tools(State(runtime): State<Arc<AdapterRuntime>>) -> Json<ToolDiscovery> {
    Json(runtime.discovery())
}

/// Builds the HTTP application for one adapter.
pub fn router(runtime: Arc<AdapterRuntime>, require_auth: bool) -> Router {
    let server = McpServer::new(runtime.clone());

    let factory = server.clone();
    let streamable = StreamableHttpService::new(
        move || Ok(factory.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );

    let app = Router::new()
        .route(HEALTH_PATH, get(health))
        .route("/tools", get(tools))
        .with_state(runtime)
        .nest_service("/mcp", streamable)
        .merge(sse::router(server, sse::SessionTable::default()));

    if require_auth {
        app.layer(middleware::from_fn(auth_middleware))
    } else {
        app
    }
}

impl App {
    /// Run the MCP server with HTTP transport.
    pub async fn run_serve(&self, adapter: Adapter, host: &str, port: u16) -> Result<()> {
        tracing::info!(%adapter, "Starting HTTP server");

        let (config, runtime) = super::runtime(adapter)?;

        if config.server.require_auth {
            tracing::info!("Bearer token required on all routes except {}", HEALTH_PATH);
        } else {
            tracing::warn!("Requests without a bearer token are accepted");
        }

        let app = router(runtime.clone(), config.server.require_auth);

        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| color_eyre::eyre::eyre!("Invalid address {}:{}: {}", host, port, e))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Failed to bind to {}: {}", addr, e))?;

        tracing::info!("HTTP server listening on http://{}", addr);

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
        runtime.shutdown().await;
        result.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            color_eyre::eyre::eyre!("HTTP server error: {}", e)
        })?;

        tracing::info!("HTTP server shutting down");
        Ok(())
    }
}

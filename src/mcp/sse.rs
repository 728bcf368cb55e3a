//! Legacy SSE transport: `GET /sse` opens an event stream, `POST /messages`
//! delivers client messages to it.
//!
//! Each stream is a session keyed by a ULID. The first event is `endpoint`,
//! carrying the URL the client must POST to. The session is removed from
//! the table when the event stream is dropped.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::{stream, Stream, StreamExt};
use rmcp::model::{ClientJsonRpcMessage, GetExtensions, ServerJsonRpcMessage};
use rmcp::ServiceExt;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::context::InvocationContext;
use crate::mcp::McpServer;

/// One connected SSE client.
#[derive(Clone)]
pub struct Session {
    to_server: UnboundedSender<ClientJsonRpcMessage>,
    context: Arc<RwLock<InvocationContext>>,
}

impl Session {
    /// Updates the cached context from the headers of a POSTed message.
    ///
    /// The cache is replaced only when the message carries a bearer token
    /// different from the cached one. Returns the context to use.
    pub async fn refresh_context(&self, incoming: InvocationContext) -> InvocationContext {
        {
            let cached = self.context.read().await;
            if incoming.auth_token.is_none() || incoming.auth_token == cached.auth_token {
                return cached.clone();
            }
        }

        let mut cached = self.context.write().await;
        tracing::debug!("Refreshing SSE session credentials");
        cached.auth_token = incoming.auth_token;
        if incoming.graphql_url.is_some() {
            cached.graphql_url = incoming.graphql_url;
        }
        cached.clone()
    }
}

/// Live sessions keyed by session ID.
#[derive(Clone, Default)]
pub struct SessionTable {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionTable {
    pub async fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn insert(&self, id: String, session: Session) {
        self.sessions.write().await.insert(id, session);
    }

    async fn remove(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            tracing::info!(session = %id, "SSE session closed");
        }
    }
}

/// Removes its session from the table when the event stream is dropped.
struct SessionGuard {
    table: SessionTable,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let table = self.table.clone();
        let id = std::mem::take(&mut self.id);
        tokio::spawn(async move { table.remove(&id).await });
    }
}

#[derive(Clone)]
struct SseState {
    server: McpServer,
    sessions: SessionTable,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Routes for the legacy transport: `GET /sse` and `POST /messages`.
pub fn router(server: McpServer, sessions: SessionTable) -> Router {
    Router::new()
        .route("/sse", get(connect))
        .route("/messages", post(message))
        .with_state(SseState { server, sessions })
}

async fn connect(
    State(state): State<SseState>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = ulid::Ulid::new().to_string();
    let (to_client, from_server) = mpsc::unbounded::<ServerJsonRpcMessage>();
    let (to_server, from_client) = mpsc::unbounded::<ClientJsonRpcMessage>();

    let session = Session {
        to_server,
        context: Arc::new(RwLock::new(InvocationContext::from_headers(&headers))),
    };
    state.sessions.insert(id.clone(), session).await;
    tracing::info!(session = %id, "SSE session opened");

    let server = state.server.clone();
    let session_id = id.clone();
    tokio::spawn(async move {
        match server.serve((to_client, from_client)).await {
            Ok(running) => {
                if let Err(e) = running.waiting().await {
                    tracing::warn!(session = %session_id, error = %e, "SSE session task failed");
                }
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "SSE session failed to initialize")
            }
        }
    });

    let guard = SessionGuard {
        table: state.sessions.clone(),
        id: id.clone(),
    };
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", id));

    let messages = from_server.map(move |message| {
        let _guard = &guard;
        let data = serde_json::to_string(&message).unwrap_or_else(|_| "{}".to_string());
        Ok(Event::default().event("message").data(data))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

async fn message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    headers: HeaderMap,
    Json(mut message): Json<ClientJsonRpcMessage>,
) -> Response {
    let Some(session) = state.sessions.get(&query.session_id).await else {
        return (StatusCode::NOT_FOUND, "Session not found").into_response();
    };

    let ctx = session
        .refresh_context(InvocationContext::from_headers(&headers))
        .await;
    if let ClientJsonRpcMessage::Request(request) = &mut message {
        request.request.extensions_mut().insert(ctx);
    }

    if session.to_server.unbounded_send(message).is_err() {
        return (StatusCode::GONE, "Session closed").into_response();
    }
    StatusCode::ACCEPTED.into_response()
}

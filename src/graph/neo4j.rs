//! Neo4j implementation of [`CypherExecutor`].
//!
//! The Bolt driver is created on first use and memoized for the lifetime of
//! the process. Query plans are fetched through the HTTP transactional
//! endpoint, which returns the plan tree of an `EXPLAIN` statement.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{BoltNull, BoltType, ConfigBuilder, Graph, Query};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

use crate::config::Neo4jConfig;
use crate::error::AppError;
use crate::graph::row::{Params, Row};
use crate::graph::traits::{AccessMode, CypherExecutor};
use crate::render::PlanNode;

/// Neo4j client with a lazily connected, shared Bolt driver.
pub struct Neo4jClient {
    config: Neo4jConfig,
    graph: Mutex<Option<Arc<Graph>>>,
    http: reqwest::Client,
}

impl Neo4jClient {
    pub fn new(config: &Neo4jConfig) -> Self {
        Self {
            config: config.clone(),
            graph: Mutex::new(None),
            http: reqwest::Client::new(),
        }
    }

    /// Returns the memoized driver, connecting on first use.
    async fn graph(&self) -> Result<Arc<Graph>, AppError> {
        let mut guard = self.graph.lock().await;
        if let Some(graph) = guard.as_ref() {
            return Ok(graph.clone());
        }

        tracing::info!(uri = %self.config.uri, database = %self.config.database, "Connecting to Neo4j");
        let config = ConfigBuilder::default()
            .uri(self.config.uri.as_str())
            .user(self.config.username.as_str())
            .password(self.config.password.as_str())
            .db(self.config.database.as_str())
            .build()?;
        let graph = Arc::new(Graph::connect(config).await?);
        tracing::info!("Connected to Neo4j");

        *guard = Some(graph.clone());
        Ok(graph)
    }

    /// Drops the memoized driver; the next query reconnects.
    pub async fn shutdown(&self) {
        if self.graph.lock().await.take().is_some() {
            tracing::info!("Closed Neo4j driver");
        }
    }
}

#[async_trait]
impl CypherExecutor for Neo4jClient {
    async fn execute_cypher(
        &self,
        cypher: &str,
        params: Params,
        mode: AccessMode,
    ) -> Result<Vec<Row>, AppError> {
        let graph = self.graph().await?;
        let query = params
            .iter()
            .fold(Query::new(cypher.to_string()), |q, (key, value)| {
                q.param(key, to_bolt(value))
            });

        tracing::debug!(?mode, "Executing Cypher");
        let query_error = |e: neo4rs::Error| AppError::Query {
            message: e.to_string(),
            query: cypher.to_string(),
        };

        let mut stream = match mode {
            AccessMode::Read => graph.execute(query).await.map_err(query_error)?,
            AccessMode::Write => {
                let mut txn = graph.start_txn().await.map_err(query_error)?;
                let mut stream = txn.execute(query).await.map_err(query_error)?;
                let mut rows = Vec::new();
                while let Some(row) = stream.next(txn.handle()).await.map_err(query_error)? {
                    rows.push(convert_row(&row, cypher)?);
                }
                txn.commit().await.map_err(query_error)?;
                return Ok(rows);
            }
        };

        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(query_error)? {
            rows.push(convert_row(&row, cypher)?);
        }
        Ok(rows)
    }

    async fn explain_cypher(&self, cypher: &str) -> Result<PlanNode, AppError> {
        let url = format!(
            "{}/db/{}/tx/commit",
            self.config.http_base(),
            self.config.database
        );
        let body = json!({
            "statements": [{ "statement": format!("EXPLAIN {}", cypher) }]
        });

        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let payload: Value = response.json().await?;

        plan_from_response(&payload, cypher).map_err(|err| match err {
            AppError::Internal(_) if !status.is_success() => AppError::Api {
                status: status.as_u16(),
                message: payload.to_string(),
            },
            other => other,
        })
    }
}

/// Extracts the plan root from an HTTP transactional endpoint response.
fn plan_from_response(payload: &Value, cypher: &str) -> Result<PlanNode, AppError> {
    if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
        if let Some(error) = errors.first() {
            let code = error.get("code").and_then(Value::as_str).unwrap_or("");
            let message = error.get("message").and_then(Value::as_str).unwrap_or("");
            return Err(AppError::Query {
                message: format!("{}: {}", code, message),
                query: cypher.to_string(),
            });
        }
    }

    let root = payload
        .pointer("/results/0/plan/root")
        .cloned()
        .ok_or_else(|| AppError::Internal("Neo4j returned no query plan".to_string()))?;
    Ok(serde_json::from_value(root)?)
}

fn convert_row(row: &neo4rs::Row, cypher: &str) -> Result<Row, AppError> {
    row.to::<Map<String, Value>>()
        .map(Row::new)
        .map_err(|e| AppError::Query {
            message: format!("failed to decode row: {}", e),
            query: cypher.to_string(),
        })
}

/// Converts a JSON parameter into a Bolt value.
fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.clone().into(),
        Value::Array(items) => items.iter().map(to_bolt).collect::<Vec<BoltType>>().into(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k.clone(), to_bolt(v)))
            .collect::<HashMap<String, BoltType>>()
            .into(),
    }
}

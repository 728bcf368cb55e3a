//! DuckDB / MotherDuck connection management and query execution.
//!
//! One connection is opened lazily and reused by every invocation in the
//! process. It is reopened when a request arrives with a different token
//! than the one the cached connection was opened with.

use std::sync::{Arc, Mutex};

use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use serde_json::{Number, Value};

use crate::config::AnalyticsConfig;
use crate::context::InvocationContext;
use crate::error::AppError;

/// Column names plus positional rows of a query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

struct OpenConnection {
    token: Option<String>,
    connection: Connection,
}

/// Memoized DuckDB connection shared across invocations.
pub struct AnalyticsConnector {
    config: AnalyticsConfig,
    state: Arc<Mutex<Option<OpenConnection>>>,
}

impl AnalyticsConnector {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            config: config.clone(),
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Connection target for the given token.
    ///
    /// With a token the MotherDuck cloud database is opened, otherwise the
    /// configured local database.
    pub fn target(&self, token: Option<&str>) -> String {
        match token {
            Some(token) => format!(
                "md:{}?motherduck_token={}",
                self.config.motherduck_database, token
            ),
            None => self.config.database.clone(),
        }
    }

    /// Runs a SQL statement and collects every row.
    pub async fn query(&self, ctx: &InvocationContext, sql: &str) -> Result<QueryResult, AppError> {
        let token = ctx
            .token_or(self.config.motherduck_token.as_deref())
            .map(str::to_string);
        let target = self.target(token.as_deref());
        let state = self.state.clone();
        let sql = sql.to_string();

        tokio::task::spawn_blocking(move || {
            let mut guard = state
                .lock()
                .map_err(|_| AppError::Internal("analytics connection lock poisoned".to_string()))?;

            let cached = guard.as_ref().map(|open| open.token.as_deref());
            if needs_reopen(cached, token.as_deref()) {
                tracing::info!(
                    motherduck = token.is_some(),
                    "Opening analytics database connection"
                );
                let connection = open_connection(&target)?;
                *guard = Some(OpenConnection { token, connection });
            }

            let open = guard
                .as_ref()
                .ok_or_else(|| AppError::Internal("analytics connection missing".to_string()))?;
            run_query(&open.connection, &sql)
        })
        .await
        .map_err(|e| AppError::Internal(format!("analytics task failed: {}", e)))?
    }

    /// Drops the cached connection, if any.
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.state.lock() {
            if guard.take().is_some() {
                tracing::info!("Closed analytics database connection");
            }
        }
    }
}

/// Whether the cached connection must be replaced for a request.
///
/// `cached` is `None` when nothing is open yet, otherwise the token the open
/// connection was created with.
fn needs_reopen(cached: Option<Option<&str>>, incoming: Option<&str>) -> bool {
    match cached {
        None => true,
        Some(token) => token != incoming,
    }
}

fn open_connection(target: &str) -> Result<Connection, AppError> {
    if target == ":memory:" {
        Ok(Connection::open_in_memory()?)
    } else {
        Ok(Connection::open(target)?)
    }
}

fn run_query(connection: &Connection, sql: &str) -> Result<QueryResult, AppError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query([])?;
    let columns: Vec<String> = rows
        .as_ref()
        .map(|s| s.column_names())
        .unwrap_or_default();

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            let value: DuckValue = row.get(i)?;
            values.push(to_json(value));
        }
        result.push(values);
    }

    Ok(QueryResult {
        columns,
        rows: result,
    })
}

/// Converts a DuckDB value into JSON for rendering.
fn to_json(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => i.into(),
        DuckValue::SmallInt(i) => i.into(),
        DuckValue::Int(i) => i.into(),
        DuckValue::BigInt(i) => i.into(),
        DuckValue::UTinyInt(i) => i.into(),
        DuckValue::USmallInt(i) => i.into(),
        DuckValue::UInt(i) => i.into(),
        DuckValue::UBigInt(i) => i.into(),
        DuckValue::HugeInt(i) => Value::String(i.to_string()),
        DuckValue::Float(f) => float(f64::from(f)),
        DuckValue::Double(f) => float(f),
        DuckValue::Decimal(d) => Value::String(d.to_string()),
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::String(s),
        DuckValue::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(to_json).collect())
        }
        other => Value::String(format!("{:?}", other)),
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(f.to_string()))
}

//! Analytics adapter tools over DuckDB / MotherDuck.

use std::sync::Arc;

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::success_response;
use crate::render::format_table;
use crate::services::analytics::QueryResult;
use crate::services::AnalyticsConnector;
use crate::tools::{NoParams, ToolRegistry};

/// Default and maximum row counts for sample_table.
const DEFAULT_SAMPLE_ROWS: i64 = 10;
const MAX_SAMPLE_ROWS: i64 = 100;

// ============================================================================
// Parameter Types
// ============================================================================

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Aligned text table.
    #[default]
    Table,
    /// Pretty-printed JSON array of row objects.
    Json,
}

/// Parameters for query tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryParams {
    /// SQL statement to execute.
    pub sql: String,
    /// Output format (default: table).
    #[serde(default)]
    pub format: TableFormat,
}

/// Parameters for list_tables tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTablesParams {
    /// Only tables in this database.
    #[serde(default)]
    pub database: Option<String>,
    /// Only tables in this schema.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Parameters for describe_table tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeTableParams {
    /// Table name.
    pub table: String,
    /// Database containing the table.
    #[serde(default)]
    pub database: Option<String>,
    /// Schema containing the table.
    #[serde(default)]
    pub schema: Option<String>,
}

/// Parameters for sample_table tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SampleTableParams {
    /// Table name.
    pub table: String,
    /// Database containing the table.
    #[serde(default)]
    pub database: Option<String>,
    /// Schema containing the table.
    #[serde(default)]
    pub schema: Option<String>,
    /// Number of rows to return (1-100, default: 10).
    #[serde(default)]
    #[schemars(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

// ============================================================================
// Registry
// ============================================================================

/// Builds the analytics tool registry.
pub fn registry(analytics: Arc<AnalyticsConnector>) -> Result<ToolRegistry, AppError> {
    ToolRegistry::builder(analytics)
        .tool(
            "query",
            "Run a SQL query against DuckDB or MotherDuck and return the result as a table.",
            "executing query",
            query,
        )
        .tool(
            "list_databases",
            "List attached databases.",
            "listing databases",
            list_databases,
        )
        .tool(
            "list_tables",
            "List tables and views, optionally filtered by database and schema.",
            "listing tables",
            list_tables,
        )
        .tool(
            "describe_table",
            "Describe the columns of a table: name, type, nullability and default.",
            "describing table",
            describe_table,
        )
        .tool(
            "sample_table",
            "Return the first rows of a table (1-100, default 10).",
            "sampling table",
            sample_table,
        )
        .build()
}

// ============================================================================
// SQL helpers
// ============================================================================

/// Quotes a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quotes an identifier, doubling embedded double quotes.
pub fn quote_identifier(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn qualified_name(database: Option<&str>, schema: Option<&str>, table: &str) -> String {
    [database, schema, Some(table)]
        .into_iter()
        .flatten()
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// `WHERE` clause over information_schema catalog/schema columns.
fn catalog_filter(
    database: Option<&str>,
    schema: Option<&str>,
    table: Option<&str>,
) -> String {
    let conditions: Vec<String> = [
        database.map(|d| format!("table_catalog = {}", quote_literal(d))),
        schema.map(|s| format!("table_schema = {}", quote_literal(s))),
        table.map(|t| format!("table_name = {}", quote_literal(t))),
    ]
    .into_iter()
    .flatten()
    .collect();

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

fn table_text(label: &str, result: &QueryResult) -> String {
    let count = result.rows.len();
    format!(
        "{} ({} row{}):\n{}",
        label,
        count,
        if count == 1 { "" } else { "s" },
        format_table(&result.columns, &result.rows)
    )
}

fn row_objects(result: &QueryResult) -> Vec<Map<String, Value>> {
    result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect()
        })
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn query(
    analytics: Arc<AnalyticsConnector>,
    params: QueryParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let result = analytics.query(&ctx, &params.sql).await?;
    match params.format {
        TableFormat::Table => Ok(table_text("Query result", &result)),
        TableFormat::Json => success_response("Query result", &row_objects(&result)),
    }
}

pub async fn list_databases(
    analytics: Arc<AnalyticsConnector>,
    _: NoParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let result = analytics
        .query(
            &ctx,
            "SELECT database_name, path FROM duckdb_databases() \
             WHERE NOT internal ORDER BY database_name",
        )
        .await?;
    Ok(table_text("Databases", &result))
}

pub async fn list_tables(
    analytics: Arc<AnalyticsConnector>,
    params: ListTablesParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let sql = format!(
        "SELECT table_catalog, table_schema, table_name, table_type \
         FROM information_schema.tables{} \
         ORDER BY table_catalog, table_schema, table_name",
        catalog_filter(params.database.as_deref(), params.schema.as_deref(), None)
    );
    let result = analytics.query(&ctx, &sql).await?;
    Ok(table_text("Tables", &result))
}

pub async fn describe_table(
    analytics: Arc<AnalyticsConnector>,
    params: DescribeTableParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let sql = format!(
        "SELECT column_name, data_type, is_nullable, column_default \
         FROM information_schema.columns{} \
         ORDER BY ordinal_position",
        catalog_filter(
            params.database.as_deref(),
            params.schema.as_deref(),
            Some(&params.table)
        )
    );
    let result = analytics.query(&ctx, &sql).await?;
    if result.rows.is_empty() {
        return Err(AppError::Validation(format!(
            "table '{}' not found",
            params.table
        )));
    }
    Ok(table_text(&format!("Columns of {}", params.table), &result))
}

pub async fn sample_table(
    analytics: Arc<AnalyticsConnector>,
    params: SampleTableParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_SAMPLE_ROWS);
    if !(1..=MAX_SAMPLE_ROWS).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_SAMPLE_ROWS, limit
        )));
    }

    let sql = format!(
        "SELECT * FROM {} LIMIT {}",
        qualified_name(
            params.database.as_deref(),
            params.schema.as_deref(),
            &params.table
        ),
        limit
    );
    let result = analytics.query(&ctx, &sql).await?;
    Ok(table_text(&format!("Sample of {}", params.table), &result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use rmcp::model::JsonObject;
    use serde_json::json;

    async fn seeded() -> ToolRegistry {
        let analytics = Arc::new(AnalyticsConnector::new(&AnalyticsConfig::default()));
        let ctx = InvocationContext::default();
        analytics
            .query(&ctx, "CREATE TABLE people (id INTEGER NOT NULL, name VARCHAR)")
            .await
            .unwrap();
        analytics
            .query(&ctx, "INSERT INTO people VALUES (1, 'Bob'), (22, 'Alice')")
            .await
            .unwrap();
        registry(analytics).unwrap()
    }

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[tokio::test]
    async fn test_query_renders_table() {
        let outcome = seeded()
            .await
            .invoke(
                "query",
                args(json!({"sql": "SELECT id, name FROM people ORDER BY id"})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.text(),
            "Query result (2 rows):\nid | name\n---|------\n1  | Bob\n22 | Alice"
        );
    }

    #[tokio::test]
    async fn test_query_json_format() {
        let outcome = seeded()
            .await
            .invoke(
                "query",
                args(json!({"sql": "SELECT name FROM people WHERE id = 1", "format": "json"})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.text(),
            "Query result:\n[\n  {\n    \"name\": \"Bob\"\n  }\n]"
        );
    }

    #[tokio::test]
    async fn test_sql_error_is_envelope() {
        let outcome = seeded()
            .await
            .invoke(
                "query",
                args(json!({"sql": "SELECT * FROM missing_table"})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert!(outcome.text().starts_with("Error executing query: DuckDB error"));
    }

    #[tokio::test]
    async fn test_list_and_describe_tables() {
        let registry = seeded().await;
        let ctx = InvocationContext::default();

        let tables = registry
            .invoke("list_tables", args(json!({"schema": "main"})), ctx.clone())
            .await
            .unwrap();
        assert!(tables.text().contains("people"));

        let columns = registry
            .invoke("describe_table", args(json!({"table": "people"})), ctx.clone())
            .await
            .unwrap();
        let text = columns.text();
        assert!(text.starts_with("Columns of people (2 rows):"));
        assert!(text.contains("INTEGER"));
        assert!(text.contains("VARCHAR"));

        let missing = registry
            .invoke("describe_table", args(json!({"table": "ghost"})), ctx)
            .await
            .unwrap();
        assert_eq!(missing.text(), "Error describing table: table 'ghost' not found");
    }

    #[tokio::test]
    async fn test_sample_table_limits() {
        let registry = seeded().await;
        let ctx = InvocationContext::default();

        let sample = registry
            .invoke("sample_table", args(json!({"table": "people", "limit": 1})), ctx.clone())
            .await
            .unwrap();
        assert!(sample.text().starts_with("Sample of people (1 row):"));

        let rejected = registry
            .invoke("sample_table", args(json!({"table": "people", "limit": 500})), ctx)
            .await
            .unwrap();
        assert_eq!(
            rejected.text(),
            "Error sampling table: limit must be between 1 and 100, got 500"
        );
    }

    #[tokio::test]
    async fn test_list_databases_includes_memory() {
        let outcome = seeded()
            .await
            .invoke("list_databases", None, InvocationContext::default())
            .await
            .unwrap();
        assert!(outcome.text().contains("memory"));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(
            qualified_name(Some("db"), None, "t"),
            "\"db\".\"t\""
        );
        assert_eq!(
            catalog_filter(None, Some("main"), Some("people")),
            " WHERE table_schema = 'main' AND table_name = 'people'"
        );
    }
}

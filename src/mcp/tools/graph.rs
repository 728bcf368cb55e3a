//! Graph adapter tools: schema introspection, Cypher execution and query plans.

use std::sync::Arc;

use rmcp::model::JsonObject;
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::context::InvocationContext;
use crate::error::AppError;
use crate::graph::{is_write_query, AccessMode, CypherExecutor, Params, Row};
use crate::mcp::protocol::success_response;
use crate::render::{format_table, render_plan, render_text, rows_from_objects};
use crate::tools::ToolRegistry;

const APOC_SCHEMA_QUERY: &str = "CALL apoc.meta.schema() YIELD value RETURN value";

const LABELS_QUERY: &str = "CALL db.labels() YIELD label RETURN collect(label) AS labels";
const RELATIONSHIP_TYPES_QUERY: &str = "CALL db.relationshipTypes() YIELD relationshipType \
     RETURN collect(relationshipType) AS relationshipTypes";
const PROPERTY_KEYS_QUERY: &str =
    "CALL db.propertyKeys() YIELD propertyKey RETURN collect(propertyKey) AS propertyKeys";
const CONSTRAINTS_QUERY: &str = "SHOW CONSTRAINTS";
const INDEXES_QUERY: &str = "SHOW INDEXES";

/// Appended to the basic schema when APOC is unavailable.
pub const APOC_NOTE: &str = "Note: the APOC plugin is not installed, so only basic schema \
     information is shown. Install APOC to get node properties, relationship directions \
     and cardinalities from apoc.meta.schema().";

// ============================================================================
// Parameter Types
// ============================================================================

/// Output format for Cypher results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table.
    Table,
    /// Pretty-printed JSON array of row objects.
    #[default]
    Json,
    /// Indented human-readable text.
    Text,
}

/// Parameters for get_schema tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetSchemaParams {
    /// Output format (default: json).
    #[serde(default)]
    pub format: OutputFormat,
}

/// Parameters for read_cypher and write_cypher tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CypherParams {
    /// Cypher query.
    pub query: String,
    /// Parameters referenced as `$name` in the query.
    #[serde(default)]
    pub params: JsonObject,
    /// Output format (default: json).
    #[serde(default)]
    pub format: OutputFormat,
}

/// Parameters for explain_query tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExplainParams {
    /// Cypher query to plan without executing.
    pub query: String,
}

// ============================================================================
// Registry
// ============================================================================

/// Builds the graph tool registry over any Cypher executor.
pub fn registry(graph: Arc<dyn CypherExecutor>) -> Result<ToolRegistry, AppError> {
    ToolRegistry::builder(graph)
        .tool(
            "get_schema",
            "Get the graph schema: labels, relationship types, properties, constraints and indexes.",
            "getting schema",
            get_schema,
        )
        .tool(
            "read_cypher",
            "Execute a read-only Cypher query. Queries that write are rejected; use write_cypher.",
            "executing read query",
            read_cypher,
        )
        .tool(
            "write_cypher",
            "Execute a Cypher query that modifies the graph.",
            "executing write query",
            write_cypher,
        )
        .tool(
            "explain_query",
            "Show the execution plan of a Cypher query without running it.",
            "explaining query",
            explain_query,
        )
        .build()
}

// ============================================================================
// Rendering
// ============================================================================

fn render_rows(label: &str, rows: Vec<Row>, format: OutputFormat) -> Result<String, AppError> {
    let columns = rows.first().map(Row::columns).unwrap_or_default();
    let rows: Vec<Map<String, Value>> = rows.into_iter().map(Row::into_object).collect();

    match format {
        OutputFormat::Json => success_response(label, &rows),
        OutputFormat::Text => Ok(format!(
            "{}:\n{}",
            label,
            render_text(&Value::Array(rows.into_iter().map(Value::Object).collect()), 0)
        )),
        OutputFormat::Table => {
            if columns.is_empty() {
                return Ok(format!("{}: no rows", label));
            }
            let cells = rows_from_objects(&columns, &rows);
            Ok(format!("{}:\n{}", label, format_table(&columns, &cells)))
        }
    }
}

fn render_value(label: &str, value: &Value, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Text => Ok(format!("{}:\n{}", label, render_text(value, 0))),
        _ => success_response(label, value),
    }
}

fn to_params(object: JsonObject) -> Params {
    object.into_iter().collect()
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_schema(
    graph: Arc<dyn CypherExecutor>,
    params: GetSchemaParams,
    _: InvocationContext,
) -> Result<String, AppError> {
    match graph
        .execute_cypher(APOC_SCHEMA_QUERY, Params::new(), AccessMode::Read)
        .await
    {
        Ok(rows) => {
            let schema = rows
                .into_iter()
                .next()
                .and_then(|row| row.take("value"))
                .unwrap_or(Value::Null);
            render_value("Schema", &schema, params.format)
        }
        Err(err) if err.is_missing_procedure() => {
            tracing::info!("apoc.meta.schema unavailable, using basic schema queries");
            let schema = basic_schema(graph.as_ref()).await?;
            let text = render_value("Schema", &schema, params.format)?;
            Ok(format!("{}\n\n{}", text, APOC_NOTE))
        }
        Err(err) => Err(err),
    }
}

/// Runs the five metadata queries in parallel and merges their results.
async fn basic_schema(graph: &dyn CypherExecutor) -> Result<Value, AppError> {
    let read = |cypher: &'static str| graph.execute_cypher(cypher, Params::new(), AccessMode::Read);

    let (labels, relationship_types, property_keys, constraints, indexes) = tokio::try_join!(
        read(LABELS_QUERY),
        read(RELATIONSHIP_TYPES_QUERY),
        read(PROPERTY_KEYS_QUERY),
        read(CONSTRAINTS_QUERY),
        read(INDEXES_QUERY),
    )?;

    let first_column = |rows: Vec<Row>, column: &str| {
        rows.into_iter()
            .next()
            .and_then(|row| row.take(column))
            .unwrap_or_else(|| json!([]))
    };
    let all_rows = |rows: Vec<Row>| {
        Value::Array(
            rows.into_iter()
                .map(|row| Value::Object(row.into_object()))
                .collect(),
        )
    };

    Ok(json!({
        "labels": first_column(labels, "labels"),
        "relationshipTypes": first_column(relationship_types, "relationshipTypes"),
        "propertyKeys": first_column(property_keys, "propertyKeys"),
        "constraints": all_rows(constraints),
        "indexes": all_rows(indexes),
    }))
}

pub async fn read_cypher(
    graph: Arc<dyn CypherExecutor>,
    params: CypherParams,
    _: InvocationContext,
) -> Result<String, AppError> {
    if is_write_query(&params.query) {
        return Err(AppError::Validation(
            "query modifies the graph; use write_cypher".to_string(),
        ));
    }

    let rows = graph
        .execute_cypher(&params.query, to_params(params.params), AccessMode::Read)
        .await?;
    render_rows("Results", rows, params.format)
}

pub async fn write_cypher(
    graph: Arc<dyn CypherExecutor>,
    params: CypherParams,
    _: InvocationContext,
) -> Result<String, AppError> {
    let rows = graph
        .execute_cypher(&params.query, to_params(params.params), AccessMode::Write)
        .await?;
    render_rows("Results", rows, params.format)
}

pub async fn explain_query(
    graph: Arc<dyn CypherExecutor>,
    params: ExplainParams,
    _: InvocationContext,
) -> Result<String, AppError> {
    let plan = graph.explain_cypher(&params.query).await?;
    Ok(format!("Query plan:\n{}", render_plan(&plan)))
}

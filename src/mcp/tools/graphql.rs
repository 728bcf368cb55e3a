//! GraphQL adapter tools: schema discovery plus query and mutation execution
//! against the endpoint named by the `X-GraphQL-URL` header.

use std::sync::Arc;

use rmcp::model::JsonObject;
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::success_response;
use crate::render::render_text;
use crate::services::graphql::{operation_kind, OperationKind, INTROSPECTION_QUERY, TYPE_QUERY};
use crate::services::GraphqlClient;
use crate::tools::ToolRegistry;

// ============================================================================
// Parameter Types
// ============================================================================

/// Output format for GraphQL results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Indented human-readable text.
    Text,
}

/// Parameters for introspect_schema tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct IntrospectSchemaParams {
    /// Include built-in introspection types (names starting with "__").
    #[serde(default)]
    pub include_builtin: bool,
    /// Output format (default: json).
    #[serde(default)]
    pub format: ResultFormat,
}

/// Parameters for describe_type tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeTypeParams {
    /// Type name (e.g., "User", "Query").
    pub name: String,
    /// Output format (default: json).
    #[serde(default)]
    pub format: ResultFormat,
}

/// Parameters for query_graphql tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryGraphqlParams {
    /// GraphQL query document.
    pub query: String,
    /// Variables referenced by the document.
    #[serde(default)]
    pub variables: Option<JsonObject>,
    /// Output format (default: json).
    #[serde(default)]
    pub format: ResultFormat,
}

/// Parameters for mutate_graphql tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MutateGraphqlParams {
    /// GraphQL mutation document.
    pub mutation: String,
    /// Variables referenced by the document.
    #[serde(default)]
    pub variables: Option<JsonObject>,
    /// Output format (default: json).
    #[serde(default)]
    pub format: ResultFormat,
}

// ============================================================================
// Registry
// ============================================================================

/// Builds the GraphQL tool registry.
pub fn registry(client: Arc<GraphqlClient>) -> Result<ToolRegistry, AppError> {
    ToolRegistry::builder(client)
        .tool(
            "introspect_schema",
            "Introspect the GraphQL schema: root operation types and a summary of every named type.",
            "introspecting schema",
            introspect_schema,
        )
        .tool(
            "describe_type",
            "Describe a single GraphQL type: fields, arguments, input fields and enum values.",
            "describing type",
            describe_type,
        )
        .tool(
            "query_graphql",
            "Execute a read-only GraphQL query. Mutations are rejected; use mutate_graphql.",
            "executing query",
            query_graphql,
        )
        .tool(
            "mutate_graphql",
            "Execute a GraphQL mutation.",
            "executing mutation",
            mutate_graphql,
        )
        .build()
}

fn render(label: &str, data: &Value, format: ResultFormat) -> Result<String, AppError> {
    match format {
        ResultFormat::Json => success_response(label, data),
        ResultFormat::Text => Ok(format!("{}:\n{}", label, render_text(data, 0))),
    }
}

/// Flattens a nested type reference into SDL notation (e.g. `[User!]!`).
fn type_ref(value: &Value) -> String {
    let of_type = value.get("ofType").map(type_ref).unwrap_or_default();
    match value.get("kind").and_then(Value::as_str) {
        Some("NON_NULL") => format!("{}!", of_type),
        Some("LIST") => format!("[{}]", of_type),
        _ => value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Condenses a full introspection result into root types plus one entry per type.
fn summarize_schema(schema: &Value, include_builtin: bool) -> Value {
    let root = |key: &str| schema.pointer(&format!("/{}/name", key)).cloned();

    let types: Vec<Value> = schema
        .get("types")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter(|t| {
            include_builtin
                || !t
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .starts_with("__")
        })
        .map(summarize_type)
        .collect();

    json!({
        "queryType": root("queryType"),
        "mutationType": root("mutationType"),
        "subscriptionType": root("subscriptionType"),
        "types": types,
    })
}

fn summarize_type(t: &Value) -> Value {
    let mut summary = Map::new();
    summary.insert("name".into(), t.get("name").cloned().unwrap_or(Value::Null));
    summary.insert("kind".into(), t.get("kind").cloned().unwrap_or(Value::Null));
    if let Some(description) = t.get("description").filter(|d| !d.is_null()) {
        summary.insert("description".into(), description.clone());
    }

    let fields = |key: &str| -> Option<Value> {
        let items = t.get(key)?.as_array()?;
        Some(
            items
                .iter()
                .map(|f| {
                    let name = f.get("name").and_then(Value::as_str).unwrap_or_default();
                    match f.get("type") {
                        Some(ty) => Value::String(format!("{}: {}", name, type_ref(ty))),
                        None => Value::String(name.to_string()),
                    }
                })
                .collect(),
        )
    };
    if let Some(list) = fields("fields") {
        summary.insert("fields".into(), list);
    }
    if let Some(list) = fields("inputFields") {
        summary.insert("inputFields".into(), list);
    }
    if let Some(list) = fields("enumValues") {
        summary.insert("enumValues".into(), list);
    }
    Value::Object(summary)
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn introspect_schema(
    client: Arc<GraphqlClient>,
    params: IntrospectSchemaParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let data = client.execute(&ctx, INTROSPECTION_QUERY, None).await?;
    let schema = data
        .get("__schema")
        .ok_or_else(|| AppError::GraphQl("introspection returned no __schema".to_string()))?;

    render(
        "Schema",
        &summarize_schema(schema, params.include_builtin),
        params.format,
    )
}

pub async fn describe_type(
    client: Arc<GraphqlClient>,
    params: DescribeTypeParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let mut variables = Map::new();
    variables.insert("name".into(), Value::String(params.name.clone()));

    let data = client.execute(&ctx, TYPE_QUERY, Some(&variables)).await?;
    match data.get("__type").filter(|t| !t.is_null()) {
        Some(ty) => render(&format!("Type {}", params.name), ty, params.format),
        None => Err(AppError::Validation(format!(
            "type '{}' not found in schema",
            params.name
        ))),
    }
}

pub async fn query_graphql(
    client: Arc<GraphqlClient>,
    params: QueryGraphqlParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    match operation_kind(&params.query) {
        OperationKind::Query => {}
        OperationKind::Mutation => {
            return Err(AppError::Validation(
                "mutations are not allowed here; use mutate_graphql".to_string(),
            ))
        }
        OperationKind::Subscription => {
            return Err(AppError::Validation(
                "subscriptions are not supported".to_string(),
            ))
        }
    }

    let data = client
        .execute(&ctx, &params.query, params.variables.as_ref())
        .await?;
    render("Query result", &data, params.format)
}

pub async fn mutate_graphql(
    client: Arc<GraphqlClient>,
    params: MutateGraphqlParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    if operation_kind(&params.mutation) != OperationKind::Mutation {
        return Err(AppError::Validation(
            "document is not a mutation; use query_graphql for queries".to_string(),
        ));
    }

    let data = client
        .execute(&ctx, &params.mutation, params.variables.as_ref())
        .await?;
    render("Mutation result", &data, params.format)
}

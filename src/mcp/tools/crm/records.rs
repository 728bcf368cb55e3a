//! Record tools: search, read and the create / update / upsert / delete helpers.

use std::sync::Arc;

use rmcp::model::JsonObject;
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::unwrap_data;
use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::{message_response, success_response};
use crate::services::CrmClient;
use crate::tools::{validate_pagination, PaginationParams, ValidatedPagination};

// ============================================================================
// Parameter Types
// ============================================================================

/// Parameters for search_records tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchRecordsParams {
    /// Object type slug or ID (e.g., "people", "companies").
    pub object: String,
    /// Filter expression in the CRM filter syntax.
    #[serde(default)]
    pub filter: Option<Value>,
    /// Sort specifications, applied in order.
    #[serde(default)]
    pub sorts: Option<Vec<Value>>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Parameters for get_record and delete_record tools.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RecordRefParams {
    /// Object type slug or ID.
    pub object: String,
    /// Record ID.
    pub record_id: String,
}

/// Parameters for create_record tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateRecordParams {
    /// Object type slug or ID.
    pub object: String,
    /// Attribute values keyed by attribute slug.
    pub values: JsonObject,
}

/// Parameters for update_record tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateRecordParams {
    /// Object type slug or ID.
    pub object: String,
    /// Record ID.
    pub record_id: String,
    /// Partial attribute values. Multiselect attributes are appended to, not replaced.
    pub values: JsonObject,
}

/// Parameters for upsert_record tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpsertRecordParams {
    /// Object type slug or ID.
    pub object: String,
    /// Attribute values keyed by attribute slug.
    pub values: JsonObject,
    /// Unique attribute used to find an existing record (e.g., "email_addresses").
    #[serde(default)]
    pub matching_attribute: Option<String>,
}

/// Body of a search request: optional filter and sorts plus pagination.
pub(super) fn query_body(
    filter: Option<Value>,
    sorts: Option<Vec<Value>>,
    page: ValidatedPagination,
) -> Value {
    let mut body = Map::new();
    if let Some(filter) = filter {
        body.insert("filter".into(), filter);
    }
    if let Some(sorts) = sorts {
        body.insert("sorts".into(), Value::Array(sorts));
    }
    body.insert("limit".into(), page.limit.into());
    body.insert("offset".into(), page.offset.into());
    Value::Object(body)
}

/// Record writes must be wrapped in the API's `data` envelope.
fn values_body(values: JsonObject) -> Value {
    json!({ "data": { "values": values } })
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn search_records(
    crm: Arc<CrmClient>,
    params: SearchRecordsParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let page = validate_pagination(params.pagination, crm.search_limit)?;
    let body = query_body(params.filter, params.sorts, page);

    let records = crm
        .post(&ctx, &["v2", "objects", &params.object, "records", "query"], &body)
        .await?;
    success_response("Records", &unwrap_data(records))
}

pub async fn get_record(
    crm: Arc<CrmClient>,
    params: RecordRefParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let record = crm
        .get(
            &ctx,
            &["v2", "objects", &params.object, "records", &params.record_id],
            &[],
        )
        .await?;
    success_response("Record", &unwrap_data(record))
}

pub async fn create_record(
    crm: Arc<CrmClient>,
    params: CreateRecordParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let record = crm
        .post(
            &ctx,
            &["v2", "objects", &params.object, "records"],
            &values_body(params.values),
        )
        .await?;
    success_response("Created record", &unwrap_data(record))
}

pub async fn update_record(
    crm: Arc<CrmClient>,
    params: UpdateRecordParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let record = crm
        .patch(
            &ctx,
            &["v2", "objects", &params.object, "records", &params.record_id],
            &values_body(params.values),
        )
        .await?;
    success_response("Updated record", &unwrap_data(record))
}

pub async fn upsert_record(
    crm: Arc<CrmClient>,
    params: UpsertRecordParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let query: Vec<(&str, String)> = params
        .matching_attribute
        .into_iter()
        .map(|attribute| ("matching_attribute", attribute))
        .collect();

    let record = crm
        .put(
            &ctx,
            &["v2", "objects", &params.object, "records"],
            &query,
            &values_body(params.values),
        )
        .await?;
    success_response("Upserted record", &unwrap_data(record))
}

pub async fn delete_record(
    crm: Arc<CrmClient>,
    params: RecordRefParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    crm.delete(
        &ctx,
        &["v2", "objects", &params.object, "records", &params.record_id],
    )
    .await?;
    message_response(format!(
        "Record {} deleted from {}",
        params.record_id, params.object
    ))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{args, crm_registry};
    use crate::context::InvocationContext;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_record_wraps_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/objects/people/records"))
            .and(body_json(json!({"data": {"values": {"name": "Ada"}}})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"id": {"record_id": "r1"}}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = crm_registry(&server.uri())
            .invoke(
                "create_record",
                args(json!({"object": "people", "values": {"name": "Ada"}})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.text(),
            "Created record:\n{\n  \"id\": {\n    \"record_id\": \"r1\"\n  }\n}"
        );
    }

    #[tokio::test]
    async fn test_update_record_patches() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/v2/objects/companies/records/c1"))
            .and(body_json(json!({"data": {"values": {"categories": ["SaaS"]}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = crm_registry(&server.uri())
            .invoke(
                "update_record",
                args(json!({
                    "object": "companies",
                    "record_id": "c1",
                    "values": {"categories": ["SaaS"]}
                })),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_upsert_passes_matching_attribute() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/objects/people/records"))
            .and(query_param("matching_attribute", "email_addresses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = crm_registry(&server.uri())
            .invoke(
                "upsert_record",
                args(json!({
                    "object": "people",
                    "values": {"email_addresses": ["ada@example.com"]},
                    "matching_attribute": "email_addresses"
                })),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert!(outcome.text().starts_with("Upserted record:"));
    }

    #[tokio::test]
    async fn test_delete_returns_plain_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v2/objects/people/records/r1"))
            .and(header("Authorization", "Bearer caller"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let ctx = InvocationContext {
            auth_token: Some("caller".into()),
            graphql_url: None,
        };
        let outcome = crm_registry(&server.uri())
            .invoke(
                "delete_record",
                args(json!({"object": "people", "record_id": "r1"})),
                ctx,
            )
            .await
            .unwrap();
        assert_eq!(outcome.text(), "Record r1 deleted from people");
    }

    #[tokio::test]
    async fn test_missing_values_is_invalid_arguments() {
        let err = crm_registry("https://crm.example.com")
            .invoke(
                "create_record",
                args(json!({"object": "people"})),
                InvocationContext::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("values"));
    }
}

//! CRM adapter tools: records, notes, tasks, comments, lists and workspace metadata.
//!
//! Every handler performs one REST call against the CRM `/v2` API, except
//! `describe_workspace` which fans out four reads and fails as a whole if
//! any of them fails.

mod activity;
mod lists;
mod records;
mod workspace;

use std::sync::Arc;

use serde_json::Value;

use crate::error::AppError;
use crate::services::CrmClient;
use crate::tools::ToolRegistry;

/// Builds the CRM tool registry around a shared client.
pub fn registry(crm: Arc<CrmClient>) -> Result<ToolRegistry, AppError> {
    ToolRegistry::builder(crm)
        // Workspace
        .tool(
            "describe_workspace",
            "Describe the CRM workspace: current token, objects, lists and members in one call.",
            "describing workspace",
            workspace::describe_workspace,
        )
        .tool(
            "identify_self",
            "Identify the workspace and scopes of the current API token.",
            "identifying token",
            workspace::identify_self,
        )
        .tool(
            "list_objects",
            "List all object types in the workspace (people, companies, custom objects).",
            "listing objects",
            workspace::list_objects,
        )
        .tool(
            "list_attributes",
            "List the attributes defined on an object type.",
            "listing attributes",
            workspace::list_attributes,
        )
        .tool(
            "list_workspace_members",
            "List the members of the workspace.",
            "listing workspace members",
            workspace::list_workspace_members,
        )
        // Records
        .tool(
            "search_records",
            "Search records of an object type with optional filter and sorts. Requires limit (1-10).",
            "searching records",
            records::search_records,
        )
        .tool(
            "get_record",
            "Get a single record by ID.",
            "getting record",
            records::get_record,
        )
        .tool(
            "create_record",
            "Create a record from attribute values.",
            "creating record",
            records::create_record,
        )
        .tool(
            "update_record",
            "Update a record with partial attribute values. Multiselect values are appended.",
            "updating record",
            records::update_record,
        )
        .tool(
            "upsert_record",
            "Create or update a record, matching existing records on a unique attribute.",
            "upserting record",
            records::upsert_record,
        )
        .tool(
            "delete_record",
            "Delete a record by ID.",
            "deleting record",
            records::delete_record,
        )
        // Notes
        .tool(
            "create_note",
            "Create a note on a record.",
            "creating note",
            activity::create_note,
        )
        .tool(
            "list_notes",
            "List notes, optionally for a single record. Requires limit (1-10).",
            "listing notes",
            activity::list_notes,
        )
        .tool(
            "delete_note",
            "Delete a note by ID.",
            "deleting note",
            activity::delete_note,
        )
        // Tasks
        .tool(
            "create_task",
            "Create a task, optionally linked to a record and assigned to members.",
            "creating task",
            activity::create_task,
        )
        .tool(
            "list_tasks",
            "List tasks with optional completion and record filters. Requires limit (1-10).",
            "listing tasks",
            activity::list_tasks,
        )
        .tool(
            "update_task",
            "Update a task's deadline, completion state or assignees.",
            "updating task",
            activity::update_task,
        )
        .tool(
            "delete_task",
            "Delete a task by ID.",
            "deleting task",
            activity::delete_task,
        )
        // Comments
        .tool(
            "create_comment",
            "Comment on a record or reply to an existing thread.",
            "creating comment",
            activity::create_comment,
        )
        .tool(
            "list_threads",
            "List comment threads on a record.",
            "listing threads",
            activity::list_threads,
        )
        .tool(
            "delete_comment",
            "Delete a comment by ID.",
            "deleting comment",
            activity::delete_comment,
        )
        // Lists
        .tool(
            "list_lists",
            "List all lists in the workspace.",
            "listing lists",
            lists::list_lists,
        )
        .tool(
            "search_list_entries",
            "Search the entries of a list with optional filter and sorts. Requires limit (1-10).",
            "searching list entries",
            lists::search_list_entries,
        )
        .tool(
            "add_list_entry",
            "Add a record to a list.",
            "adding list entry",
            lists::add_list_entry,
        )
        .tool(
            "remove_list_entry",
            "Remove an entry from a list.",
            "removing list entry",
            lists::remove_list_entry,
        )
        .build()
}

/// Strips the API's `{"data": ...}` wrapper from a response.
fn unwrap_data(response: Value) -> Value {
    match response {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// The given object type, or the configured default.
fn object_or_default<'a>(crm: &'a CrmClient, object: &'a Option<String>) -> &'a str {
    object.as_deref().unwrap_or(crm.default_object.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrmConfig;
    use crate::context::InvocationContext;
    use rmcp::model::JsonObject;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(super) fn crm_registry(base_url: &str) -> ToolRegistry {
        let crm = CrmClient::new(&CrmConfig {
            base_url: base_url.to_string(),
            api_key: Some("key".into()),
            ..CrmConfig::default()
        })
        .unwrap();
        registry(Arc::new(crm)).unwrap()
    }

    pub(super) fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[test]
    fn test_catalog_is_complete() {
        let registry = crm_registry("https://crm.example.com");
        assert_eq!(registry.catalog().iter().count(), 25);
        for name in ["search_records", "upsert_record", "list_threads", "remove_list_entry"] {
            assert!(registry.catalog().get(name).is_some(), "missing {}", name);
        }
    }

    #[tokio::test]
    async fn test_describe_workspace_combines_four_reads() {
        let server = MockServer::start().await;
        for (route, body) in [
            ("/v2/self", json!({"workspace_name": "Acme"})),
            ("/v2/objects", json!({"data": [{"api_slug": "people"}]})),
            ("/v2/lists", json!({"data": [{"api_slug": "pipeline"}]})),
            ("/v2/workspace_members", json!({"data": [{"first_name": "Ada"}]})),
        ] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;
        }

        let outcome = crm_registry(&server.uri())
            .invoke("describe_workspace", None, InvocationContext::default())
            .await
            .unwrap();
        let text = outcome.text();
        assert!(text.starts_with("Workspace:\n"));
        assert!(text.contains("\"workspace_name\": \"Acme\""));
        assert!(text.contains("\"api_slug\": \"pipeline\""));
        assert!(text.contains("\"first_name\": \"Ada\""));
    }

    #[tokio::test]
    async fn test_describe_workspace_fails_if_any_read_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/lists"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let outcome = crm_registry(&server.uri())
            .invoke("describe_workspace", None, InvocationContext::default())
            .await
            .unwrap();
        assert_eq!(
            outcome.text(),
            "Error describing workspace: API error (403): Forbidden"
        );
    }

    #[tokio::test]
    async fn test_search_records_sends_validated_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/objects/companies/records/query"))
            .and(body_json(json!({
                "filter": {"name": "Acme"},
                "limit": 5,
                "offset": 0
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": {"record_id": "r1"}}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let outcome = crm_registry(&server.uri())
            .invoke(
                "search_records",
                args(json!({"object": "companies", "filter": {"name": "Acme"}, "limit": 5})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert!(outcome.text().starts_with("Records:\n"));
    }

    #[tokio::test]
    async fn test_search_records_rejects_limit_before_calling_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let registry = crm_registry(&server.uri());
        let outcome = registry
            .invoke(
                "search_records",
                args(json!({"object": "people", "limit": 25})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.text(),
            "Error searching records: limit must be between 1 and 10, got 25"
        );

        let outcome = registry
            .invoke(
                "search_records",
                args(json!({"object": "people", "offset": 5})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.text(), "Error searching records: limit is required");
    }

    #[tokio::test]
    async fn test_list_notes_defaults_parent_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/notes"))
            .and(query_param("parent_object", "people"))
            .and(query_param("parent_record_id", "r1"))
            .and(query_param("limit", "3"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = crm_registry(&server.uri())
            .invoke(
                "list_notes",
                args(json!({"parent_record_id": "r1", "limit": 3})),
                InvocationContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.text(), "Notes:\n[]");
    }

    #[tokio::test]
    async fn test_missing_credential_is_text_error() {
        let crm = CrmClient::new(&CrmConfig::default()).unwrap();
        let outcome = registry(Arc::new(crm))
            .unwrap()
            .invoke("identify_self", None, InvocationContext::default())
            .await
            .unwrap();
        assert!(outcome.text().starts_with("Error identifying token: CRM API key is required"));
    }

    #[test]
    fn test_unwrap_data() {
        assert_eq!(unwrap_data(json!({"data": [1]})), json!([1]));
        assert_eq!(unwrap_data(json!({"other": 1})), json!({"other": 1}));
        assert_eq!(unwrap_data(Value::Null), Value::Null);
    }
}

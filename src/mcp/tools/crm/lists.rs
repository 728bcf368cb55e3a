//! List and list entry tools.

use std::sync::Arc;

use rmcp::model::JsonObject;
use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::{json, Value};

use super::records::query_body;
use super::{object_or_default, unwrap_data};
use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::{message_response, success_response};
use crate::services::CrmClient;
use crate::tools::{validate_pagination, NoParams, PaginationParams};

/// Parameters for search_list_entries tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchListEntriesParams {
    /// List slug or ID.
    pub list: String,
    /// Filter expression in the CRM filter syntax.
    #[serde(default)]
    pub filter: Option<Value>,
    /// Sort specifications, applied in order.
    #[serde(default)]
    pub sorts: Option<Vec<Value>>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Parameters for add_list_entry tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddListEntryParams {
    /// List slug or ID.
    pub list: String,
    /// ID of the record to add.
    pub parent_record_id: String,
    /// Object type of the record (default: configured default object).
    #[serde(default)]
    pub parent_object: Option<String>,
    /// Values for list-specific attributes.
    #[serde(default)]
    pub entry_values: JsonObject,
}

/// Parameters for remove_list_entry tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveListEntryParams {
    /// List slug or ID.
    pub list: String,
    /// Entry ID.
    pub entry_id: String,
}

pub async fn list_lists(
    crm: Arc<CrmClient>,
    _: NoParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let lists = crm.get(&ctx, &["v2", "lists"], &[]).await?;
    success_response("Lists", &unwrap_data(lists))
}

pub async fn search_list_entries(
    crm: Arc<CrmClient>,
    params: SearchListEntriesParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let page = validate_pagination(params.pagination, crm.search_limit)?;
    let body = query_body(params.filter, params.sorts, page);

    let entries = crm
        .post(&ctx, &["v2", "lists", &params.list, "entries", "query"], &body)
        .await?;
    success_response("List entries", &unwrap_data(entries))
}

pub async fn add_list_entry(
    crm: Arc<CrmClient>,
    params: AddListEntryParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let body = json!({
        "data": {
            "parent_record_id": params.parent_record_id,
            "parent_object": object_or_default(&crm, &params.parent_object),
            "entry_values": params.entry_values,
        }
    });

    let entry = crm
        .post(&ctx, &["v2", "lists", &params.list, "entries"], &body)
        .await?;
    success_response("Added list entry", &unwrap_data(entry))
}

pub async fn remove_list_entry(
    crm: Arc<CrmClient>,
    params: RemoveListEntryParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    crm.delete(&ctx, &["v2", "lists", &params.list, "entries", &params.entry_id])
        .await?;
    message_response(format!(
        "Entry {} removed from list {}",
        params.entry_id, params.list
    ))
}

//! Workspace metadata tools.

use std::sync::Arc;

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::json;

use super::unwrap_data;
use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::success_response;
use crate::services::CrmClient;
use crate::tools::NoParams;

/// Parameters for list_attributes tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListAttributesParams {
    /// Object type slug or ID (e.g., "people", "companies").
    pub object: String,
}

pub async fn describe_workspace(
    crm: Arc<CrmClient>,
    _: NoParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let (identity, objects, lists, members) = tokio::try_join!(
        crm.get(&ctx, &["v2", "self"], &[]),
        crm.get(&ctx, &["v2", "objects"], &[]),
        crm.get(&ctx, &["v2", "lists"], &[]),
        crm.get(&ctx, &["v2", "workspace_members"], &[]),
    )?;

    success_response(
        "Workspace",
        &json!({
            "self": identity,
            "objects": unwrap_data(objects),
            "lists": unwrap_data(lists),
            "members": unwrap_data(members),
        }),
    )
}

pub async fn identify_self(
    crm: Arc<CrmClient>,
    _: NoParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let identity = crm.get(&ctx, &["v2", "self"], &[]).await?;
    success_response("Token identity", &identity)
}

pub async fn list_objects(
    crm: Arc<CrmClient>,
    _: NoParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let objects = crm.get(&ctx, &["v2", "objects"], &[]).await?;
    success_response("Objects", &unwrap_data(objects))
}

pub async fn list_attributes(
    crm: Arc<CrmClient>,
    params: ListAttributesParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let attributes = crm
        .get(&ctx, &["v2", "objects", &params.object, "attributes"], &[])
        .await?;
    success_response(
        &format!("Attributes of {}", params.object),
        &unwrap_data(attributes),
    )
}

pub async fn list_workspace_members(
    crm: Arc<CrmClient>,
    _: NoParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let members = crm.get(&ctx, &["v2", "workspace_members"], &[]).await?;
    success_response("Workspace members", &unwrap_data(members))
}

//! Notes, tasks and comment threads attached to records.
//!
//! The parent object type falls back to the configured default object
//! (`people` unless overridden) when the caller omits it.

use std::sync::Arc;

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{object_or_default, unwrap_data};
use crate::context::InvocationContext;
use crate::error::AppError;
use crate::mcp::protocol::{message_response, success_response};
use crate::services::CrmClient;
use crate::tools::{validate_pagination, PaginationParams, ValidatedPagination};

// ============================================================================
// Parameter Types
// ============================================================================

/// Content format of a note.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NoteFormat {
    #[default]
    Plaintext,
    Markdown,
}

/// Parameters for create_note tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateNoteParams {
    /// Object type of the parent record (default: configured default object).
    #[serde(default)]
    pub parent_object: Option<String>,
    /// ID of the record the note is attached to.
    pub parent_record_id: String,
    /// Note title.
    pub title: String,
    /// Note body.
    pub content: String,
    /// Body format (default: plaintext).
    #[serde(default)]
    pub format: NoteFormat,
}

/// Parameters for list_notes tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListNotesParams {
    /// Object type of the parent record (default: configured default object).
    #[serde(default)]
    pub parent_object: Option<String>,
    /// Only list notes attached to this record.
    #[serde(default)]
    pub parent_record_id: Option<String>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Parameters for delete_note tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteNoteParams {
    /// Note ID.
    pub note_id: String,
}

/// Parameters for create_task tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateTaskParams {
    /// Task description.
    pub content: String,
    /// Deadline as an ISO 8601 timestamp.
    #[serde(default)]
    pub deadline_at: Option<String>,
    /// Whether the task starts completed (default: false).
    #[serde(default)]
    pub is_completed: bool,
    /// Record to link the task to.
    #[serde(default)]
    pub linked_record_id: Option<String>,
    /// Object type of the linked record (default: configured default object).
    #[serde(default)]
    pub linked_object: Option<String>,
    /// Workspace member IDs to assign.
    #[serde(default)]
    pub assignee_ids: Vec<String>,
}

/// Sort order for list_tasks.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskSort {
    CreatedAtAsc,
    CreatedAtDesc,
}

impl TaskSort {
    fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAtAsc => "created_at:asc",
            Self::CreatedAtDesc => "created_at:desc",
        }
    }
}

/// Parameters for list_tasks tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListTasksParams {
    /// Filter by completion state.
    #[serde(default)]
    pub is_completed: Option<bool>,
    /// Only tasks linked to this record.
    #[serde(default)]
    pub linked_record_id: Option<String>,
    /// Object type of the linked record (default: configured default object).
    #[serde(default)]
    pub linked_object: Option<String>,
    /// Sort order.
    #[serde(default)]
    pub sort: Option<TaskSort>,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

/// Parameters for update_task tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateTaskParams {
    /// Task ID.
    pub task_id: String,
    /// New deadline as an ISO 8601 timestamp.
    #[serde(default)]
    pub deadline_at: Option<String>,
    /// New completion state.
    #[serde(default)]
    pub is_completed: Option<bool>,
    /// Replacement list of assigned workspace member IDs.
    #[serde(default)]
    pub assignee_ids: Option<Vec<String>>,
}

/// Parameters for delete_task tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteTaskParams {
    /// Task ID.
    pub task_id: String,
}

/// Parameters for create_comment tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateCommentParams {
    /// Comment body (plaintext).
    pub content: String,
    /// Workspace member ID of the author.
    pub author_id: String,
    /// Reply to this thread instead of starting a new one on a record.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Record to comment on (required when no thread_id is given).
    #[serde(default)]
    pub record_id: Option<String>,
    /// Object type of the record (default: configured default object).
    #[serde(default)]
    pub object: Option<String>,
}

/// Parameters for list_threads tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListThreadsParams {
    /// Record whose threads to list.
    pub record_id: String,
    /// Object type of the record (default: configured default object).
    #[serde(default)]
    pub object: Option<String>,
}

/// Parameters for delete_comment tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DeleteCommentParams {
    /// Comment ID.
    pub comment_id: String,
}

fn page_query(page: ValidatedPagination) -> Vec<(&'static str, String)> {
    vec![
        ("limit", page.limit.to_string()),
        ("offset", page.offset.to_string()),
    ]
}

fn assignees(ids: Vec<String>) -> Value {
    ids.into_iter()
        .map(|id| {
            json!({
                "referenced_actor_type": "workspace-member",
                "referenced_actor_id": id,
            })
        })
        .collect()
}

// ============================================================================
// Notes
// ============================================================================

pub async fn create_note(
    crm: Arc<CrmClient>,
    params: CreateNoteParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let body = json!({
        "data": {
            "parent_object": object_or_default(&crm, &params.parent_object),
            "parent_record_id": params.parent_record_id,
            "title": params.title,
            "format": params.format,
            "content": params.content,
        }
    });

    let note = crm.post(&ctx, &["v2", "notes"], &body).await?;
    success_response("Created note", &unwrap_data(note))
}

pub async fn list_notes(
    crm: Arc<CrmClient>,
    params: ListNotesParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let page = validate_pagination(params.pagination, crm.search_limit)?;

    let mut query = page_query(page);
    if let Some(record_id) = params.parent_record_id {
        query.push((
            "parent_object",
            object_or_default(&crm, &params.parent_object).to_string(),
        ));
        query.push(("parent_record_id", record_id));
    }

    let notes = crm.get(&ctx, &["v2", "notes"], &query).await?;
    success_response("Notes", &unwrap_data(notes))
}

pub async fn delete_note(
    crm: Arc<CrmClient>,
    params: DeleteNoteParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    crm.delete(&ctx, &["v2", "notes", &params.note_id]).await?;
    message_response(format!("Note {} deleted", params.note_id))
}

// ============================================================================
// Tasks
// ============================================================================

pub async fn create_task(
    crm: Arc<CrmClient>,
    params: CreateTaskParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let linked_records: Vec<Value> = params
        .linked_record_id
        .iter()
        .map(|record_id| {
            json!({
                "target_object": object_or_default(&crm, &params.linked_object),
                "target_record_id": record_id,
            })
        })
        .collect();

    let body = json!({
        "data": {
            "content": params.content,
            "format": "plaintext",
            "deadline_at": params.deadline_at,
            "is_completed": params.is_completed,
            "linked_records": linked_records,
            "assignees": assignees(params.assignee_ids),
        }
    });

    let task = crm.post(&ctx, &["v2", "tasks"], &body).await?;
    success_response("Created task", &unwrap_data(task))
}

pub async fn list_tasks(
    crm: Arc<CrmClient>,
    params: ListTasksParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let page = validate_pagination(params.pagination, crm.search_limit)?;

    let mut query = page_query(page);
    if let Some(is_completed) = params.is_completed {
        query.push(("is_completed", is_completed.to_string()));
    }
    if let Some(record_id) = params.linked_record_id {
        query.push((
            "linked_object",
            object_or_default(&crm, &params.linked_object).to_string(),
        ));
        query.push(("linked_record_id", record_id));
    }
    if let Some(sort) = params.sort {
        query.push(("sort", sort.as_str().to_string()));
    }

    let tasks = crm.get(&ctx, &["v2", "tasks"], &query).await?;
    success_response("Tasks", &unwrap_data(tasks))
}

pub async fn update_task(
    crm: Arc<CrmClient>,
    params: UpdateTaskParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let mut data = Map::new();
    if let Some(deadline_at) = params.deadline_at {
        data.insert("deadline_at".into(), deadline_at.into());
    }
    if let Some(is_completed) = params.is_completed {
        data.insert("is_completed".into(), is_completed.into());
    }
    if let Some(ids) = params.assignee_ids {
        data.insert("assignees".into(), assignees(ids));
    }
    if data.is_empty() {
        return Err(AppError::Validation(
            "at least one of deadline_at, is_completed or assignee_ids is required".to_string(),
        ));
    }

    let task = crm
        .patch(&ctx, &["v2", "tasks", &params.task_id], &json!({ "data": data }))
        .await?;
    success_response("Updated task", &unwrap_data(task))
}

pub async fn delete_task(
    crm: Arc<CrmClient>,
    params: DeleteTaskParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    crm.delete(&ctx, &["v2", "tasks", &params.task_id]).await?;
    message_response(format!("Task {} deleted", params.task_id))
}

// ============================================================================
// Comments
// ============================================================================

pub async fn create_comment(
    crm: Arc<CrmClient>,
    params: CreateCommentParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let mut data = Map::new();
    data.insert("format".into(), "plaintext".into());
    data.insert("content".into(), params.content.into());
    data.insert(
        "author".into(),
        json!({ "type": "workspace-member", "id": params.author_id }),
    );

    match (params.thread_id, params.record_id) {
        (Some(thread_id), _) => {
            data.insert("thread_id".into(), thread_id.into());
        }
        (None, Some(record_id)) => {
            data.insert(
                "record".into(),
                json!({
                    "object": object_or_default(&crm, &params.object),
                    "record_id": record_id,
                }),
            );
        }
        (None, None) => {
            return Err(AppError::Validation(
                "either thread_id or record_id is required".to_string(),
            ))
        }
    }

    let comment = crm
        .post(&ctx, &["v2", "comments"], &json!({ "data": data }))
        .await?;
    success_response("Created comment", &unwrap_data(comment))
}

pub async fn list_threads(
    crm: Arc<CrmClient>,
    params: ListThreadsParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    let query = [
        ("object", object_or_default(&crm, &params.object).to_string()),
        ("record_id", params.record_id),
    ];
    let threads = crm.get(&ctx, &["v2", "threads"], &query).await?;
    success_response("Threads", &unwrap_data(threads))
}

pub async fn delete_comment(
    crm: Arc<CrmClient>,
    params: DeleteCommentParams,
    ctx: InvocationContext,
) -> Result<String, AppError> {
    crm.delete(&ctx, &["v2", "comments", &params.comment_id])
        .await?;
    message_response(format!("Comment {} deleted", params.comment_id))
}

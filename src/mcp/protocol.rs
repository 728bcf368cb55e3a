//! MCP protocol response helpers.
//!
//! Handlers produce plain text. The dispatcher keeps success and failure
//! apart as a [`ToolOutcome`] and only flattens it into a text envelope at
//! the transport boundary.

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::AppError;

/// Result of a single tool invocation, before it is sent to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The handler produced a response text.
    Success(String),
    /// The handler failed while performing `operation`.
    Failure { operation: String, message: String },
}

impl ToolOutcome {
    /// Builds a failure outcome from an error.
    pub fn failure(operation: &str, message: impl Into<String>) -> Self {
        Self::Failure {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The text placed in the response envelope.
    pub fn text(&self) -> String {
        match self {
            Self::Success(text) => text.clone(),
            Self::Failure { operation, message } => error_text(operation, message),
        }
    }
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        // Failures travel as ordinary text content; clients detect them by the `Error` prefix.
        CallToolResult::success(vec![Content::text(outcome.text())])
    }
}

/// Renders a labelled, pretty-printed JSON payload.
pub fn success_response<T: Serialize + ?Sized>(label: &str, payload: &T) -> Result<String, AppError> {
    let body = serde_json::to_string_pretty(payload)?;
    Ok(format!("{}:\n{}", label, body))
}

/// A plain confirmation message with no payload.
pub fn message_response(message: impl Into<String>) -> Result<String, AppError> {
    Ok(message.into())
}

/// Formats the error envelope text: `Error <operation>: <message>`.
pub fn error_text(operation: &str, message: &str) -> String {
    format!("Error {}: {}", operation, message)
}

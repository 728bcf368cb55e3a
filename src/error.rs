//! Application error types with MCP protocol conversion.

use rmcp::model::ErrorCode;
use thiserror::Error;

/// Application-level errors shared by every adapter.
#[derive(Error, Debug)]
pub enum AppError {
    // Catalog / dispatch errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Duplicate tool name in catalog: {0}")]
    DuplicateTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Validation(String),

    // Credential errors
    #[error("{0}")]
    MissingCredential(String),

    // External service errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    #[error("Neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    #[error("Neo4j query error: {message}")]
    Query { message: String, query: String },

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the error reports a Cypher procedure that is not installed.
    ///
    /// Neo4j answers `Neo.ClientError.Procedure.ProcedureNotFound` with a
    /// message of the form "There is no procedure with the name `x`".
    pub fn is_missing_procedure(&self) -> bool {
        let message = self.to_string();
        message.contains("ProcedureNotFound") || message.contains("There is no procedure")
    }
}

impl From<AppError> for rmcp::model::ErrorData {
    fn from(err: AppError) -> Self {
        let (code, app_code) = match &err {
            AppError::ToolNotFound(_) => (ErrorCode::METHOD_NOT_FOUND, "TOOL_NOT_FOUND"),
            AppError::DuplicateTool(_) => (ErrorCode::INTERNAL_ERROR, "DUPLICATE_TOOL"),
            AppError::InvalidArguments(_) => (ErrorCode::INVALID_PARAMS, "INVALID_ARGUMENTS"),
            AppError::Validation(_) => (ErrorCode::INVALID_PARAMS, "VALIDATION_ERROR"),
            AppError::MissingCredential(_) => (ErrorCode::INVALID_REQUEST, "MISSING_CREDENTIAL"),
            AppError::Http(_) => (ErrorCode::INTERNAL_ERROR, "HTTP_ERROR"),
            AppError::Api { .. } => (ErrorCode::INTERNAL_ERROR, "API_ERROR"),
            AppError::GraphQl(_) => (ErrorCode::INTERNAL_ERROR, "GRAPHQL_ERROR"),
            AppError::Neo4j(_) => (ErrorCode::INTERNAL_ERROR, "CONNECTION_ERROR"),
            AppError::Query { .. } => (ErrorCode::INTERNAL_ERROR, "QUERY_ERROR"),
            AppError::DuckDb(_) => (ErrorCode::INTERNAL_ERROR, "DUCKDB_ERROR"),
            AppError::Serialization(_) => (ErrorCode::INTERNAL_ERROR, "SERIALIZATION_ERROR"),
            AppError::Config(_) => (ErrorCode::INTERNAL_ERROR, "CONFIG_ERROR"),
            AppError::Internal(_) => (ErrorCode::INTERNAL_ERROR, "INTERNAL_ERROR"),
        };

        rmcp::model::ErrorData::new(code, format!("[{}] {}", app_code, err), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_maps_to_method_not_found() {
        let data: rmcp::model::ErrorData = AppError::ToolNotFound("nope".into()).into();
        assert_eq!(data.code, ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(data.message, "[TOOL_NOT_FOUND] Tool not found: nope");
    }

    #[test]
    fn test_invalid_arguments_maps_to_invalid_params() {
        let data: rmcp::model::ErrorData =
            AppError::InvalidArguments("missing field `object`".into()).into();
        assert_eq!(data.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_missing_procedure_detection() {
        let err = AppError::Query {
            message: "Neo.ClientError.Procedure.ProcedureNotFound: There is no procedure with the name `apoc.meta.schema` registered".into(),
            query: "CALL apoc.meta.schema()".into(),
        };
        assert!(err.is_missing_procedure());
        assert!(!AppError::Internal("boom".into()).is_missing_procedure());
    }
}

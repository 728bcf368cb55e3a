//! Pagination argument validation for search-style tools.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Raw pagination arguments as supplied by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct PaginationParams {
    /// Maximum number of results to return (required).
    #[serde(default)]
    pub limit: Option<i64>,
    /// Number of results to skip (default: 0).
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Pagination arguments that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedPagination {
    pub limit: u32,
    pub offset: u32,
}

impl From<ValidatedPagination> for PaginationParams {
    fn from(p: ValidatedPagination) -> Self {
        Self {
            limit: Some(p.limit.into()),
            offset: Some(p.offset.into()),
        }
    }
}

/// Validates `{limit, offset}` against `[1, max]`.
///
/// `limit` is mandatory, `offset` defaults to 0 and must not be negative.
pub fn validate_pagination(
    params: PaginationParams,
    max: u32,
) -> Result<ValidatedPagination, AppError> {
    let limit = params
        .limit
        .ok_or_else(|| AppError::Validation("limit is required".to_string()))?;

    if limit < 1 || limit > i64::from(max) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            max, limit
        )));
    }

    let offset = params.offset.unwrap_or(0);
    let offset = u32::try_from(offset).map_err(|_| {
        AppError::Validation(format!("offset must be a non-negative integer, got {}", offset))
    })?;

    Ok(ValidatedPagination {
        limit: limit as u32,
        offset,
    })
}

//! Error handling for the Depot distribution platform
//!
//! Every ledger and order operation reports a typed failure; the HTTP layer
//! renders it as a consistent JSON error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::AllocationError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Ledger and order workflow errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Insufficient stock in batch {batch_code}: requested {requested}, remaining {remaining}")]
    InsufficientBatchStock {
        batch_code: String,
        requested: i32,
        remaining: i32,
    },

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Incomplete allocation: {0}")]
    IncompleteAllocation(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } | AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            AppError::InsufficientBatchStock { .. } => "INSUFFICIENT_BATCH_STOCK",
            AppError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            AppError::IncompleteAllocation(_) => "INCOMPLETE_ALLOCATION",
            AppError::InvalidStateTransition(_) => "INVALID_STATE_TRANSITION",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_)
            | AppError::InsufficientBatchStock { .. }
            | AppError::InsufficientStock(_) => StatusCode::CONFLICT,
            AppError::InvariantViolation(_)
            | AppError::IncompleteAllocation(_)
            | AppError::InvalidStateTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (message, field) = match self {
            AppError::Validation { field, message } => (message.clone(), Some(field.clone())),
            AppError::ValidationError(msg) => (msg.clone(), None),
            AppError::NotFound(resource) => (format!("{} not found", resource), None),
            AppError::Conflict(msg)
            | AppError::InvariantViolation(msg)
            | AppError::InsufficientStock(msg)
            | AppError::IncompleteAllocation(msg)
            | AppError::InvalidStateTransition(msg) => (msg.clone(), None),
            AppError::InsufficientBatchStock {
                batch_code,
                requested,
                remaining,
            } => (
                format!(
                    "Batch '{}' has {} units left but {} were requested",
                    batch_code, remaining, requested
                ),
                None,
            ),
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
            AppError::Internal(msg) => (msg.clone(), None),
        };

        ErrorDetail {
            code: self.code().to_string(),
            message,
            field,
        }
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        AppError::IncompleteAllocation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(name, _)| **name);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::validation(field, message)
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!(code = self.code(), "Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::validation("quantity", "bad").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("Order".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InsufficientBatchStock {
                batch_code: "B1".into(),
                requested: 5,
                remaining: 2
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::IncompleteAllocation("x".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_allocation_error_becomes_incomplete_allocation() {
        let err: AppError = AllocationError::QuantityMismatch {
            allocated: 8,
            required: 10,
        }
        .into();
        assert_eq!(err.code(), "INCOMPLETE_ALLOCATION");
        assert_eq!(err.detail().message, "allocated 8 but order requires 10");
    }

    #[test]
    fn test_not_found_message() {
        let detail = AppError::NotFound("Stock batch".into()).detail();
        assert_eq!(detail.message, "Stock batch not found");
        assert!(detail.field.is_none());
    }
}

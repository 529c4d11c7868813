//! Error handling for the Amoura storefront API
//!
//! Every handler error renders as `{"error": {"code", "message", ...}}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{DeliveryError, ImageError};
use thiserror::Error;

/// One rejected cart line during checkout
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CartLineIssue {
    pub product_id: uuid::Uuid,
    pub reason: String,
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    // Business logic errors
    #[error("Cart validation failed")]
    CartValidation { items: Vec<CartLineIssue> },

    #[error("{0}")]
    InvalidStateTransition(String),

    // External service errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
            details: None,
        }
    }
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// HTTP status this error renders with
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. }
            | AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::CartValidation { .. }
            | AppError::InvalidStateTransition(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(_) | AppError::Email(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            AppError::Unauthorized(msg) => ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => ErrorDetail::new("FORBIDDEN", msg.clone()),
            AppError::Validation { field, message } => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
            },
            AppError::ValidationError(msg) => ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            AppError::BadRequest(msg) => ErrorDetail::new("BAD_REQUEST", msg.clone()),
            AppError::DuplicateEntry(field) => ErrorDetail {
                field: Some(field.clone()),
                ..ErrorDetail::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                )
            },
            AppError::Conflict(msg) => ErrorDetail::new("CONFLICT", msg.clone()),
            AppError::NotFound(msg) => ErrorDetail::new("NOT_FOUND", msg.clone()),
            AppError::PayloadTooLarge(msg) => ErrorDetail::new("PAYLOAD_TOO_LARGE", msg.clone()),
            AppError::CartValidation { items } => ErrorDetail {
                details: Some(serde_json::json!({ "items": items })),
                ..ErrorDetail::new("CART_VALIDATION_FAILED", "Some cart items are invalid")
            },
            AppError::InvalidStateTransition(msg) => {
                ErrorDetail::new("INVALID_STATE_TRANSITION", msg.clone())
            }
            AppError::Storage(msg) => {
                ErrorDetail::new("STORAGE_ERROR", format!("Storage error: {}", msg))
            }
            AppError::Email(msg) => ErrorDetail::new("EMAIL_ERROR", format!("Email error: {}", msg)),
            AppError::Configuration(msg) => {
                ErrorDetail::new("CONFIGURATION_ERROR", format!("Configuration error: {}", msg))
            }
            AppError::DatabaseError(_) => {
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred")
            }
            AppError::Internal(msg) => ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            AppError::InternalError(_) => {
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by_key(|(field, _)| *field);

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::validation(field.to_string(), message)
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::UnsupportedType => AppError::BadRequest(err.to_string()),
            ImageError::TooLarge => AppError::PayloadTooLarge(err.to_string()),
        }
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::validation("delivery_date", err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

/// Map a unique-key violation to `DuplicateEntry` and a foreign-key violation
/// to `Conflict`; anything else stays a database error.
pub fn map_constraint_error(err: sqlx::Error, field: &str, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23505") => return AppError::DuplicateEntry(field.to_string()),
            Some("23503") => return AppError::Conflict(conflict_message.to_string()),
            _ => {}
        }
    }
    AppError::DatabaseError(err)
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

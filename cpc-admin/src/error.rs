//! Error types for cpc-admin
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": {"code", "message", "details"?}}` and are logged once here.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cpc_common::identity::IdentityError;
use cpc_common::models::Role;
use cpc_common::validation::ValidationErrors;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::import::ImportError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing, unknown or expired session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking the capability (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Form rule violations (400)
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Identity service refused to issue a credential
    #[error("Identity error creating {} account: {source}", .role.as_str())]
    Identity { role: Role, source: IdentityError },

    /// Bulk import failure
    #[error("Import failed: {0}")]
    Import(#[from] ImportError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// cpc-common error
    #[error("Common error: {0}")]
    Common(#[from] cpc_common::Error),
}

impl ApiError {
    pub fn identity(role: Role, source: IdentityError) -> Self {
        ApiError::Identity { role, source }
    }
}

const OPERATION_FAILED: &str = "Operation failed. Please try again.";

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut details: Option<Value> = None;

        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Validation(errors) => {
                let message = errors
                    .first()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "Validation failed".to_string());
                details = Some(json!(errors.errors));
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
            ApiError::Identity { role, source } => {
                let status = match source {
                    IdentityError::EmailInUse => StatusCode::CONFLICT,
                    IdentityError::InvalidEmail | IdentityError::WeakPassword => StatusCode::BAD_REQUEST,
                    IdentityError::Unknown(ref reason) => {
                        error!("Identity service failure: {}", reason);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, "IDENTITY_ERROR", source.user_message(role))
            }
            ApiError::Import(err) => {
                details = err.details();
                (err.status(), err.code(), err.to_string())
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", OPERATION_FAILED.to_string())
            }
            ApiError::Common(err) => match err {
                cpc_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                cpc_common::Error::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
                other => {
                    error!("Store error: {}", other);
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", OPERATION_FAILED.to_string())
                }
            },
        };

        if error_code == "VALIDATION_ERROR" {
            debug!(code = error_code, "{}", message);
        } else if status.is_client_error() {
            warn!(status = status.as_u16(), code = error_code, "{}", message);
        }

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });
        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

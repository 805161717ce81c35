//! API error types and response handling.
//!
//! Every handler error becomes a JSON body of the form
//! `{"error": code, "message": text, "details": optional}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use petfence_core::PetfenceError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details.
        details: Option<String>,
    },
}

impl ApiError {
    /// Shorthand for a 400 with the given code.
    pub fn bad_request(error_code: &str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            error_code: error_code.to_string(),
            message: message.into(),
        }
    }
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "INVALID_RADIUS",
    "message": "Invalid perimeter radius: radius must be positive, got -5",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[schema(example = "INVALID_RADIUS")]
    pub error: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest {
                error_code,
                message,
            } => {
                tracing::warn!(error_code = %error_code, message = %message, "Rejected request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: None,
                    },
                )
            }

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(serde_json::Value::String),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Client errors (4xx) become 400; everything else the server failed to do is a 500.
impl From<PetfenceError> for ApiError {
    fn from(err: PetfenceError) -> Self {
        let error_code = err.error_code().to_string();
        if (400..500).contains(&err.http_status_code()) {
            return Self::BadRequest {
                error_code,
                message: err.to_string(),
            };
        }

        let message = if err.is_config_error() {
            "Failed to save the configuration".to_string()
        } else {
            err.to_string()
        };
        Self::InternalError {
            error_code,
            message,
            details: Some(err.to_string()),
        }
    }
}

//! HTTP error mapping.
//!
//! Handlers return [`ApiError`]; it renders as
//! `{"error": .., "timestamp": .., "details"?: ..}` with the matching status.
//! `details` carries the underlying cause and is dropped in production.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tenx_auth::AuthError;
use tenx_store::StoreError;
use thiserror::Error;
use tracing::error;

/// Error returned by every handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request (400).
    #[error("{message}")]
    BadRequest {
        /// Client-facing message.
        message: String,
        /// Underlying cause.
        details: Option<String>,
    },

    /// Missing principal or rejected credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// No such record for the principal (404).
    #[error("{0}")]
    NotFound(String),

    /// Anything else (500).
    #[error("{message}")]
    Internal {
        /// Generic client-facing message.
        message: String,
        /// Underlying cause.
        details: Option<String>,
    },
}

impl ApiError {
    /// 400 with a message and no cause.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// 500 with a generic message and the cause as details.
    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: message.into(),
            details: Some(cause.to_string()),
        }
    }

    /// HTTP status of the variant.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            Self::BadRequest { details, .. } | Self::Internal { details, .. } => details.as_deref(),
            _ => None,
        }
    }

    /// Wire body. `details` is included only when `show_details` is set.
    pub fn body(&self, show_details: bool) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            details: self
                .details()
                .filter(|_| show_details)
                .map(str::to_owned),
        }
    }
}

/// JSON error body.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    /// Client-facing message.
    pub error: String,
    /// When the error was produced (RFC 3339).
    pub timestamp: String,
    /// Underlying cause, outside production only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, details = self.details().unwrap_or_default(), "request failed");
        }
        let production = tenx_settings::get_settings()
            .server
            .environment
            .is_production();
        (status, Json(self.body(!production))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => Self::BadRequest {
                message: err.to_string(),
                details: None,
            },
            other => Self::internal("Database error", other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingIdentifier => Self::bad_request(err.to_string()),
            other => Self::internal("Failed to send OTP", other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest {
            message: "Invalid request body".into(),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest {
            message: "Invalid query parameters".into(),
            details: Some(rejection.body_text()),
        }
    }
}

//! Gateway error types with HTTP status and WebSocket close code mapping.
//!
//! [`SyncError`] is the central error type. Before the upgrade completes an
//! error is rendered as a structured JSON HTTP response; after the upgrade
//! it is rendered as a WebSocket close frame via [`SyncError::close_code`].

use axum::extract::ws::close_code;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::ConnectionId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1101,
///     "message": "upgrade rejected: missing session token",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`SyncError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               | Close code |
/// |-----------|------------|---------------------------|------------|
/// | 1000–1999 | Upgrade    | 400 / 403                 | 1008       |
/// | 2000–2999 | Not Found  | 404 Not Found             | 1011       |
/// | 3000–3999 | Server     | 500 Internal Server Error | 1011       |
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The synchronized value could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The value producer failed to supply a value for the connection.
    #[error("value production failed: {0}")]
    ValueProduction(String),

    /// The upgrade guard refused the connection.
    #[error("upgrade rejected: {0}")]
    UpgradeRejected(String),

    /// No live connection with the given ID is registered.
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::UpgradeRejected(_) => 1101,
            Self::InvalidConfig(_) => 1102,
            Self::ConnectionNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::Codec(_) => 3001,
            Self::ValueProduction(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UpgradeRejected(_) => StatusCode::FORBIDDEN,
            Self::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Codec(_) | Self::ValueProduction(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the WebSocket close code used when this error ends an
    /// already-upgraded socket.
    #[must_use]
    pub const fn close_code(&self) -> u16 {
        match self {
            Self::UpgradeRejected(_) => close_code::POLICY,
            Self::Codec(_)
            | Self::ValueProduction(_)
            | Self::ConnectionNotFound(_)
            | Self::InvalidConfig(_)
            | Self::Internal(_) => close_code::ERROR,
        }
    }

    /// Short close reason sent alongside [`Self::close_code`].
    ///
    /// Close frame reasons are capped at 123 bytes, so these are fixed
    /// phrases rather than the full error message.
    #[must_use]
    pub const fn close_reason(&self) -> &'static str {
        match self {
            Self::Codec(_) => "initial snapshot could not be encoded",
            Self::ValueProduction(_) => "value unavailable",
            Self::UpgradeRejected(_) => "upgrade rejected",
            Self::ConnectionNotFound(_) => "connection not found",
            Self::InvalidConfig(_) => "invalid configuration",
            Self::Internal(_) => "internal error",
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

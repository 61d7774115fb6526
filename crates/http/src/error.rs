//! HTTP error types and implementations

#[cfg(feature = "server")]
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the edge server
#[derive(Error, Debug)]
pub enum HttpError {
    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body over the configured limit
    #[error("Payload too large")]
    PayloadTooLarge,

    /// Upstream could not be reached or returned garbage
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Upstream did not answer in time
    #[error("Gateway timeout")]
    GatewayTimeout,

    /// Internal server error
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    /// Listener or socket failure
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(feature = "server")]
impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Self::BadGateway(_) => (StatusCode::BAD_GATEWAY, "bad_gateway"),
            Self::GatewayTimeout => (StatusCode::GATEWAY_TIMEOUT, "gateway_timeout"),
            Self::InternalServerError(_) | Self::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error")
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias using HttpError
pub type Result<T> = std::result::Result<T, HttpError>;

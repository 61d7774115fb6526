//! Client error types

use crate::types::ApiErrorBody;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        /// Message parsed from the response body, if it carried one
        message: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Create error from an HTTP status and the raw response body
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        Self::Status {
            status: status.as_u16(),
            message: ApiErrorBody::extract_message(body),
        }
    }

    /// HTTP status of a non-success response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Message the server put in the error body
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// The request never produced a response
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// The server rejected the credentials (HTTP 401)
    pub fn is_auth_expired(&self) -> bool {
        self.status() == Some(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_parses_body_message() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"message": "Email already registered"}"#,
        );
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.api_message(), Some("Email already registered"));
        assert_eq!(err.to_string(), "Server error 400: Email already registered");
        assert!(!err.is_auth_expired());
    }

    #[test]
    fn test_from_status_without_message() {
        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, "nope");
        assert!(err.is_auth_expired());
        assert_eq!(err.api_message(), None);
        assert_eq!(err.to_string(), "Server error 401: no message");
    }
}

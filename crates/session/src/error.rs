//! Session error types

use portal_core::{CoreError, validation::FieldErrors};
use portal_http::client::ClientError;
use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Form input rejected before any request was made
    #[error("{0}")]
    Validation(FieldErrors),

    /// The API refused the operation; carries the user-facing message
    #[error("{0}")]
    Auth(String),

    /// A 401 survived the refresh-and-retry cycle
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// No response from the API
    #[error("Network error: {0}")]
    Network(String),

    #[error(transparent)]
    Storage(#[from] CoreError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl SessionError {
    /// Map a client error, using `fallback` when the API gave no message
    pub(crate) fn from_client(error: ClientError, fallback: &str) -> Self {
        match error {
            ClientError::Status { message, .. } => {
                Self::Auth(message.unwrap_or_else(|| fallback.to_string()))
            }
            ClientError::Request(e) if e.is_decode() => Self::Auth(fallback.to_string()),
            ClientError::Request(e) => Self::Network(e.to_string()),
            ClientError::Serialization(_) => Self::Auth(fallback.to_string()),
            ClientError::Configuration(message) => Self::Configuration(message),
        }
    }
}

impl From<FieldErrors> for SessionError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<ClientError> for SessionError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Configuration(message) => Self::Configuration(message),
            other => Self::Network(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_api_message_or_fallback() {
        let err = SessionError::from_client(
            ClientError::Status {
                status: 400,
                message: Some("Email already registered".into()),
            },
            "Registration failed",
        );
        assert_eq!(err.to_string(), "Email already registered");

        let err = SessionError::from_client(
            ClientError::Status {
                status: 500,
                message: None,
            },
            "Registration failed",
        );
        assert_eq!(err.to_string(), "Registration failed");
    }

    #[test]
    fn test_configuration_passthrough() {
        let err = SessionError::from_client(
            ClientError::Configuration("base_url is required".into()),
            "Login failed",
        );
        assert!(matches!(err, SessionError::Configuration(_)));
    }
}

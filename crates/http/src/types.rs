//! Request and response bodies of the remote auth API

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub use portal_core::types::{RegisterData, TokenPair, User};

/// `POST /auth/login` body
#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/refresh` and `POST /auth/logout`
#[derive(Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// `POST /auth/forgot-password` body
#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// `POST /auth/reset-password` body
#[derive(Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Error body returned by the remote API
///
/// The API reports failures as `{"message": ...}`; FastAPI-style `{"detail": ...}`
/// bodies are accepted too.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<JsonValue>,
}

impl ApiErrorBody {
    /// Human-readable message carried by an error body, if any
    pub fn extract_message(body: &str) -> Option<String> {
        let parsed: Self = serde_json::from_str(body).ok()?;
        parsed
            .message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| match parsed.detail {
                Some(JsonValue::String(detail)) if !detail.trim().is_empty() => Some(detail),
                // Validation errors: [{"msg": "...", ...}, ...]
                Some(JsonValue::Array(items)) => items
                    .iter()
                    .find_map(|item| item.get("msg").and_then(JsonValue::as_str))
                    .map(str::to_string),
                _ => None,
            })
    }
}

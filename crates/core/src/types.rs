//! Domain types shared by the session store, the API client and the guard

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Profile of the signed-in account as returned by `GET /users/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub last_active: Option<String>,
}

impl User {
    /// Full name, falling back to the email when both names are blank
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_string()
        }
    }
}

/// Access/refresh token pair issued by `POST /auth/login` and `POST /auth/refresh`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenPair {
    /// Lifetime of the access token
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Tokens must never end up in logs
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Payload for `POST /auth/register`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_with_missing_optional_fields() {
        let user: User = serde_json::from_str(r#"{"id": 7, "email": "a@b.co"}"#).unwrap();
        assert_eq!(user.id, 7);
        assert!(user.avatar_url.is_none());
        assert!(!user.is_superuser);
        assert_eq!(user.display_name(), "a@b.co");
    }

    #[test]
    fn test_token_pair_debug_redacts_secrets() {
        let tokens = TokenPair {
            access_token: "secret-access".into(),
            refresh_token: "secret-refresh".into(),
            expires_in: 3600,
            token_type: "bearer".into(),
        };
        let rendered = format!("{tokens:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
        assert_eq!(tokens.bearer(), "Bearer secret-access");
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let tokens: TokenPair = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "r", "expires_in": 60}"#,
        )
        .unwrap();
        assert_eq!(tokens.token_type, "bearer");
        assert_eq!(tokens.lifetime(), Duration::from_secs(60));
    }
}

#![allow(dead_code)]

use portal_core::{SessionSnapshot, TokenPair, snapshot};
use portal_http::client::PublicApiClient;
use portal_session::{MemoryStorage, SessionStore};
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::MockServer;

pub fn tokens(access: &str, expires_in: u64) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: format!("{access}-refresh"),
        expires_in,
        token_type: "bearer".to_string(),
    }
}

pub fn token_body(access: &str, expires_in: u64) -> Value {
    json!({
        "access_token": access,
        "refresh_token": format!("{access}-refresh"),
        "expires_in": expires_in,
        "token_type": "bearer"
    })
}

pub fn user_body() -> Value {
    json!({
        "id": 42,
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "is_active": true,
        "is_verified": false,
        "is_superuser": false
    })
}

pub fn authenticated_blob(tokens: TokenPair) -> String {
    snapshot::encode(&SessionSnapshot {
        user: None,
        tokens: Some(tokens),
        is_authenticated: true,
    })
    .unwrap()
}

/// Store pointed at the mock server's root
pub fn store(server: &MockServer, blob: Option<String>) -> (SessionStore, Arc<MemoryStorage>) {
    let storage = Arc::new(match blob {
        Some(blob) => MemoryStorage::with_blob(blob),
        None => MemoryStorage::new(),
    });
    let api = PublicApiClient::new(server.uri()).unwrap();
    (SessionStore::open(api, storage.clone()), storage)
}

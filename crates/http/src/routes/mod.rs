//! Route definitions for the edge server

use axum::{
    Router,
    routing::{any, get},
};

pub mod health;

/// Routes that sit behind the navigation guard
pub fn guarded() -> Router<crate::AppState> {
    Router::new().route("/api/health", get(health::health_check))
}

/// The `/api/*` rewrite; API calls carry bearer tokens, not the session cookie
pub fn proxied() -> Router<crate::AppState> {
    Router::new().route("/api/{*path}", any(crate::forwarding::forward_api))
}

//! Navigation guard backed by the persisted session cookie

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use portal_core::GuardDecision;

/// Find the named cookie across every `Cookie` header
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Redirect navigations the session does not allow
pub async fn guard_middleware(
    State(state): State<crate::AppState>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    let persisted = session_cookie(req.headers(), &state.storage_key);

    match state.guard.evaluate(path, persisted) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::Redirect(to) => {
            debug!(from = %path, to = %to, "Guard redirect");
            Redirect::temporary(&to).into_response()
        }
    }
}

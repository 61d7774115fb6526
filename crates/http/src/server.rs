//! Edge server: guard, `/api/*` rewrite and static assets

use crate::{AppState, error::Result, middleware::guard_middleware, routes};
use axum::{Router, http::StatusCode, middleware, response::IntoResponse};
use portal_core::PortalConfig;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Assemble the router for a configuration
pub fn build_router(config: &PortalConfig) -> Result<Router> {
    let state = AppState::new(config)?;

    let guarded = match &config.server.static_dir {
        Some(dir) => routes::guarded().fallback_service(ServeDir::new(dir)),
        None => routes::guarded().fallback(not_found),
    };

    Ok(guarded
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard_middleware,
        ))
        .merge(routes::proxied())
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(config: &PortalConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(config)?;
    let listener = TcpListener::bind(config.server.bind_addr).await?;

    info!(
        addr = %listener.local_addr()?,
        upstream = %config.proxy.upstream_origin,
        static_dir = ?config.server.static_dir,
        "Edge server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Edge server stopped");
    Ok(())
}

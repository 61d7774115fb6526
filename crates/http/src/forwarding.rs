//! `/api/*` rewrite: forwards API traffic to the configured remote origin

use crate::error::HttpError;
use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, header},
    response::Response,
};
use portal_core::config::{ProxyConfig, ServerConfig};
use std::time::Duration;

/// Headers that only make sense for a single hop
static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

/// Forwards requests to the upstream origin, preserving path and query
#[derive(Clone, Debug)]
pub struct Forwarder {
    client: reqwest::Client,
    upstream_origin: String,
    max_body_bytes: usize,
}

impl Forwarder {
    /// Create a forwarder for the configured upstream
    pub fn new(proxy: &ProxyConfig, server: &ServerConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(proxy.timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| HttpError::InternalServerError(format!("proxy client: {e}")))?;

        Ok(Self {
            client,
            upstream_origin: proxy.upstream_origin.trim_end_matches('/').to_string(),
            max_body_bytes: usize::try_from(server.max_body_bytes).unwrap_or(usize::MAX),
        })
    }

    pub fn upstream_origin(&self) -> &str {
        &self.upstream_origin
    }

    /// Upstream URL for a request path and optional query string
    pub fn upstream_url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(query) if !query.is_empty() => {
                format!("{}{}?{}", self.upstream_origin, path, query)
            }
            _ => format!("{}{}", self.upstream_origin, path),
        }
    }

    /// Forward one request and relay the upstream response
    #[tracing::instrument(name = "proxy.forward", skip_all, fields(method = %req.method(), path = %req.uri().path()))]
    pub async fn forward(&self, req: Request) -> Result<Response, HttpError> {
        let (parts, body) = req.into_parts();
        let url = self.upstream_url(parts.uri.path(), parts.uri.query());

        let body = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|_| HttpError::PayloadTooLarge)?;

        let mut headers = strip_hop_by_hop(parts.headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %url, error = %e, "Upstream request failed");
                if e.is_timeout() {
                    HttpError::GatewayTimeout
                } else {
                    HttpError::BadGateway(e.to_string())
                }
            })?;

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers().clone());
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| HttpError::BadGateway(e.to_string()))?;

        debug!(status = status.as_u16(), bytes = bytes.len(), "Relaying upstream response");

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers
}

/// Route handler for `/api/{*path}`
pub async fn forward_api(
    State(state): State<crate::AppState>,
    req: Request,
) -> Result<Response, HttpError> {
    state.forwarder.forward(req).await
}

//! Authenticated request wrapper with one refresh-and-retry on 401

use crate::{
    error::{SessionError, SessionResult},
    store::SessionStore,
};
use portal_core::config::ApiConfig;
use reqwest::{
    Client, Method, Response, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;
use std::time::Duration;

/// Per-request options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// Applied after the defaults, so a caller can override `Content-Type`
    pub headers: HeaderMap,
    pub body: Option<String>,
    /// Attach the bearer token and handle 401 by refreshing
    pub requires_auth: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
            requires_auth: true,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Skip the token and the 401 handling
    #[must_use]
    pub fn public(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize>(self, value: &T) -> SessionResult<Self> {
        let body = serde_json::to_string(value)
            .map_err(|e| SessionError::Configuration(format!("request body: {e}")))?;
        Ok(self.body(body))
    }
}

/// Sends requests to the API on behalf of a session
#[derive(Debug, Clone)]
pub struct AuthenticatedRequester {
    client: Client,
    base_url: String,
    store: SessionStore,
}

impl AuthenticatedRequester {
    /// Requests go to `base_url` + endpoint, e.g. `/api/v1/users/me`
    pub fn new(base_url: impl Into<String>, store: SessionStore) -> SessionResult<Self> {
        Self::with_timeout(base_url, None, store)
    }

    pub fn from_config(config: &ApiConfig, store: SessionStore) -> SessionResult<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::with_timeout(config.base_url.as_str(), timeout, store)
    }

    fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        store: SessionStore,
    ) -> SessionResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Send a request
    ///
    /// A 401 on an authenticated request triggers exactly one refresh and at
    /// most one retry. If the refresh fails the session is signed out. Any
    /// other response is returned as is.
    #[tracing::instrument(name = "session.request", skip(self, options), fields(method = %options.method))]
    pub async fn request(&self, endpoint: &str, options: RequestOptions) -> SessionResult<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        let token = if options.requires_auth {
            self.store.access_token()
        } else {
            None
        };

        let response = self.send(&url, &options, token.as_deref()).await?;

        if !options.requires_auth || response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Got 401, refreshing once");

        if let Err(e) = self.store.refresh_token().await {
            warn!(error = %e, "Refresh after 401 failed");
            self.store.logout().await;
            return Err(SessionError::AuthenticationFailed);
        }

        let Some(token) = self.store.access_token() else {
            return Err(SessionError::AuthenticationFailed);
        };

        let retry = self.send(&url, &options, Some(&token)).await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            warn!("Still unauthorized after refresh");
            return Err(SessionError::AuthenticationFailed);
        }

        Ok(retry)
    }

    /// [`request`](Self::request) then decode a successful JSON body
    pub async fn request_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> SessionResult<T> {
        let response = self.request(endpoint, options).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = portal_http::types::ApiErrorBody::extract_message(&body)
                .unwrap_or_else(|| format!("Request failed with status {status}"));
            return Err(SessionError::Auth(message));
        }
        response
            .json()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))
    }

    async fn send(
        &self,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> SessionResult<Response> {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            headers.insert(name.clone(), value.clone());
        }
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| SessionError::Configuration(format!("access token: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let mut request = self
            .client
            .request(options.method.clone(), url)
            .headers(headers);
        if let Some(body) = &options.body {
            request = request.body(body.clone());
        }

        request
            .send()
            .await
            .map_err(|e| SessionError::Network(e.to_string()))
    }
}

//! Type-safe API clients that enforce authentication requirements at compile time

use super::ClientError;
use portal_core::config::ApiConfig;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;

const USER_AGENT: &str = concat!("portal-client/", env!("CARGO_PKG_VERSION"));

/// Client for public endpoints that don't require authentication
#[derive(Clone, Debug)]
pub struct PublicApiClient {
    client: Client,
    base_url: String,
}

/// Client for endpoints that require a bearer access token
#[derive(Clone)]
pub struct AuthenticatedApiClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for AuthenticatedApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

fn build_http_client(timeout: Option<Duration>) -> Result<Client, ClientError> {
    let mut builder = ClientBuilder::new().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Turn a response into `T`, mapping non-success statuses to [`ClientError::Status`]
async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();

    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, &body))
    }
}

/// Like [`decode`] but discards a successful body
async fn expect_success(response: reqwest::Response) -> Result<(), ClientError> {
    let status = response.status();

    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, &body))
    }
}

impl PublicApiClient {
    /// Create a new public client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new_with_timeout(base_url, None)
    }

    /// Create a public client for the configured API
    pub fn from_config(config: &ApiConfig) -> Result<Self, ClientError> {
        TypedClientBuilder::from_config(config).build_public()
    }

    fn new_with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = build_http_client(timeout)?;
        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder without authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Execute a request and decode a JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        decode(request.send().await?).await
    }

    /// Execute a request whose successful body is not needed
    pub async fn execute_unit(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        expect_success(request.send().await?).await
    }

    /// Attach an access token to get an authenticated client
    pub fn authenticate(&self, access_token: impl Into<String>) -> AuthenticatedApiClient {
        AuthenticatedApiClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            access_token: access_token.into(),
        }
    }
}

impl AuthenticatedApiClient {
    /// Create a new authenticated client
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Ok(PublicApiClient::new(base_url)?.authenticate(access_token))
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder with authentication
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", self.access_token))
    }

    /// Execute a request and decode a JSON body
    pub async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ClientError> {
        decode(request.send().await?).await
    }

    /// Execute a request whose successful body is not needed
    pub async fn execute_unit(&self, request: reqwest::RequestBuilder) -> Result<(), ClientError> {
        expect_success(request.send().await?).await
    }

    /// Create a public client (useful for calling public endpoints)
    pub fn to_public(&self) -> PublicApiClient {
        PublicApiClient {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Type-safe builder that creates the appropriate client type
#[derive(Debug, Default)]
pub struct TypedClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl TypedClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded from the API configuration
    pub fn from_config(config: &ApiConfig) -> Self {
        let builder = Self::new().base_url(config.endpoint_base());
        if config.timeout_secs == 0 {
            builder
        } else {
            builder.timeout(Duration::from_secs(config.timeout_secs))
        }
    }

    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build a public client
    pub fn build_public(self) -> Result<PublicApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        PublicApiClient::new_with_timeout(base_url, self.timeout)
    }

    /// Build an authenticated client
    pub fn build_authenticated(
        self,
        access_token: impl Into<String>,
    ) -> Result<AuthenticatedApiClient, ClientError> {
        Ok(self.build_public()?.authenticate(access_token))
    }
}

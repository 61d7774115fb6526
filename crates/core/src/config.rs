//! Configuration for the portal session client and edge server

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the remote API base URL
pub const API_BASE_URL_ENV: &str = "PORTAL_API_BASE_URL";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Remote auth API
    pub api: ApiConfig,

    /// Session store and refresh scheduling
    pub session: SessionConfig,

    /// Route guard
    pub guard: GuardConfig,

    /// `/api/*` rewrite target
    pub proxy: ProxyConfig,

    /// Edge server
    pub server: ServerConfig,
}

/// Remote auth API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Origin of the remote API
    pub base_url: String,

    /// Path prefix the auth and user endpoints are mounted under
    pub prefix: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key the persisted snapshot is stored under
    pub storage_key: String,

    /// How long before expiry the scheduler refreshes
    pub refresh_margin_secs: u64,

    /// Refresh a rehydrated session once when the provider mounts
    pub refresh_on_start: bool,
}

/// Route guard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Where unauthenticated visitors are sent
    pub login_path: String,

    /// Where authenticated visitors of auth pages are sent
    pub landing_path: String,

    /// Prefix identifying auth pages
    pub auth_prefix: String,

    /// Paths reachable without a session, matched by prefix
    pub public_paths: Vec<String>,

    /// Static asset prefixes the guard never inspects
    pub bypass_prefixes: Vec<String>,
}

/// `/api/*` forwarding configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Remote origin `/api/*` traffic is forwarded to
    pub upstream_origin: String,

    /// Upstream request timeout in seconds
    pub timeout_secs: u64,
}

/// Edge server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP server
    pub bind_addr: SocketAddr,

    /// Directory served for guarded page requests
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Largest request body forwarded upstream
    pub max_body_bytes: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            prefix: "/api/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Base URL the auth endpoints hang off, e.g. `http://localhost:8000/api/v1`
    pub fn endpoint_base(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.prefix.trim_end_matches('/')
        )
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: crate::snapshot::STORAGE_KEY.to_string(),
            refresh_margin_secs: 300,
            refresh_on_start: true,
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            login_path: "/auth/login".to_string(),
            landing_path: "/dashboard".to_string(),
            auth_prefix: "/auth/".to_string(),
            public_paths: [
                "/auth/login",
                "/auth/signup",
                "/auth/forgot-password",
                "/auth/reset-password",
                "/api/health",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            bypass_prefixes: [
                "/_next/static",
                "/_next/image",
                "/favicon.ico",
                "/public",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_origin: "https://sma.sikedev.in".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            static_dir: None,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl PortalConfig {
    /// Load configuration from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a value cannot be parsed, or
    /// the result fails validation
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.prefix", defaults.api.prefix)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("session.storage_key", defaults.session.storage_key)?
            .set_default(
                "session.refresh_margin_secs",
                defaults.session.refresh_margin_secs,
            )?
            .set_default("session.refresh_on_start", defaults.session.refresh_on_start)?
            .set_default("guard.login_path", defaults.guard.login_path)?
            .set_default("guard.landing_path", defaults.guard.landing_path)?
            .set_default("guard.auth_prefix", defaults.guard.auth_prefix)?
            .set_default("guard.public_paths", defaults.guard.public_paths)?
            .set_default("guard.bypass_prefixes", defaults.guard.bypass_prefixes)?
            .set_default("proxy.upstream_origin", defaults.proxy.upstream_origin)?
            .set_default("proxy.timeout_secs", defaults.proxy.timeout_secs)?
            .set_default("server.bind_addr", defaults.server.bind_addr.to_string())?
            .set_default("server.max_body_bytes", defaults.server.max_body_bytes)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("api.base_url", std::env::var(API_BASE_URL_ENV).ok())?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the crate relies on
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid field
    pub fn validate(&self) -> CoreResult<()> {
        validators::validate_url(&self.api.base_url, "api.base_url")?;
        validators::validate_path(&self.api.prefix, "api.prefix")?;
        validators::validate_not_empty(&self.session.storage_key, "session.storage_key")?;
        validators::validate_path(&self.guard.login_path, "guard.login_path")?;
        validators::validate_path(&self.guard.landing_path, "guard.landing_path")?;
        validators::validate_path(&self.guard.auth_prefix, "guard.auth_prefix")?;
        for path in &self.guard.public_paths {
            validators::validate_path(path, "guard.public_paths")?;
        }
        validators::validate_url(&self.proxy.upstream_origin, "proxy.upstream_origin")?;
        validators::validate_port(self.server.bind_addr.port(), "server.bind_addr")?;
        Ok(())
    }

    /// Write the configuration as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Common validation helpers
mod validators {
    use crate::error::{CoreError, CoreResult};

    /// Validate that a port number is valid (1-65535)
    pub fn validate_port(port: u16, field: &str) -> CoreResult<()> {
        if port == 0 {
            return Err(CoreError::invalid_config(format!(
                "{field}: port must be between 1 and 65535"
            )));
        }
        Ok(())
    }

    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field: &str) -> CoreResult<()> {
        if value.trim().is_empty() {
            return Err(CoreError::invalid_config(format!("{field}: cannot be empty")));
        }
        Ok(())
    }

    /// Validate URL format
    pub fn validate_url(url: &str, field: &str) -> CoreResult<()> {
        url::Url::parse(url)
            .map_err(|e| CoreError::invalid_config(format!("{field}: invalid URL - {e}")))?;
        Ok(())
    }

    /// Validate that a value is an absolute path
    pub fn validate_path(path: &str, field: &str) -> CoreResult<()> {
        if !path.starts_with('/') {
            return Err(CoreError::invalid_config(format!(
                "{field}: '{path}' must start with '/'"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = PortalConfig::default();
        config.validate().unwrap();
        assert_eq!(config.api.endpoint_base(), "http://localhost:8000/api/v1");
        assert_eq!(config.session.storage_key, "auth-storage");
        assert_eq!(config.guard.landing_path, "/dashboard");
    }

    #[test]
    fn test_endpoint_base_trims_slashes() {
        let api = ApiConfig {
            base_url: "https://auth.example.com/".into(),
            prefix: "/api/v2/".into(),
            timeout_secs: 5,
        };
        assert_eq!(api.endpoint_base(), "https://auth.example.com/api/v2");
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("portal.json");
        std::fs::write(
            &path,
            r#"{"guard": {"landing_path": "/home"}, "server": {"bind_addr": "0.0.0.0:8088"}}"#,
        )
        .unwrap();

        let config = PortalConfig::load(Some(&path)).unwrap();
        assert_eq!(config.guard.landing_path, "/home");
        assert_eq!(config.guard.login_path, "/auth/login");
        assert_eq!(config.server.bind_addr.port(), 8088);
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("portal.json");
        let mut config = PortalConfig::default();
        config.proxy.upstream_origin = "https://backend.internal".into();
        config.save(&path).unwrap();

        let loaded = PortalConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.proxy.upstream_origin, "https://backend.internal");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PortalConfig::default();
        config.api.base_url = "not a url".into();
        assert!(matches!(
            config.validate(),
            Err(CoreError::InvalidConfig { .. })
        ));

        let mut config = PortalConfig::default();
        config.guard.login_path = "auth/login".into();
        assert!(config.validate().is_err());

        let mut config = PortalConfig::default();
        config.server.bind_addr = "127.0.0.1:0".parse().unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("portal.json");
        std::fs::write(&path, r#"{"proxy": {"timeout_secs": 12}}"#).unwrap();

        // SAFETY: no other test in this crate reads or writes this variable
        unsafe { std::env::set_var("PORTAL_PROXY__TIMEOUT_SECS", "7") };
        let loaded = PortalConfig::load(Some(&path));
        unsafe { std::env::remove_var("PORTAL_PROXY__TIMEOUT_SECS") };

        assert_eq!(loaded.unwrap().proxy.timeout_secs, 7);
    }
}

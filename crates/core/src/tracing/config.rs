//! Configuration for tracing output
//!
//! Logs always go to stderr; a log file can be added alongside.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main instrumentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentationConfig {
    /// Service name recorded in the startup event
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Log level filter (e.g., "info", "debug", "portal_session=trace")
    pub log_level: String,
    /// Optional file output
    #[serde(default)]
    pub log_file: Option<LogFileConfig>,
}

/// File-based logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileConfig {
    /// Directory where log files should be written
    pub directory: PathBuf,
    /// Prefix for log file names (e.g., "cli" creates "cli.log")
    pub file_prefix: String,
    /// Truncate the file on startup instead of appending
    pub truncate: bool,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            service_name: "portal".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl LogFileConfig {
    /// Full path of the log file
    pub fn path(&self) -> PathBuf {
        self.directory.join(format!("{}.log", self.file_prefix))
    }
}

impl InstrumentationConfig {
    /// Filter directive for the portal crates at the given level
    pub fn crate_filter(level: &str) -> String {
        format!(
            "portal={level},portal_core={level},portal_http={level},portal_session={level},tower_http={level}"
        )
    }

    /// Log only to stderr at `level`, scoped to the portal crates
    pub fn stderr(level: &str) -> Self {
        Self {
            log_level: Self::crate_filter(level),
            ..Self::default()
        }
    }

    /// Also write to `<directory>/<component>.log`
    #[must_use]
    pub fn with_file(mut self, directory: impl Into<PathBuf>, component: &str) -> Self {
        self.log_file = Some(LogFileConfig {
            directory: directory.into(),
            file_prefix: component.to_string(),
            truncate: true,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = InstrumentationConfig::default();
        assert_eq!(config.service_name, "portal");
        assert_eq!(config.service_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.log_level, "info");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_stderr_config_scopes_level_to_crates() {
        let config = InstrumentationConfig::stderr("debug");
        assert!(config.log_level.contains("portal_session=debug"));
        assert!(config.log_level.contains("portal_http=debug"));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_with_file() {
        let config = InstrumentationConfig::stderr("info").with_file("/tmp/portal-logs", "server");
        let file = config.log_file.unwrap();
        assert_eq!(file.path(), PathBuf::from("/tmp/portal-logs/server.log"));
        assert!(file.truncate);
    }
}

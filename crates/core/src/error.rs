//! Errors shared by the portal crates

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures loading configuration or touching persisted session state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO operation failed: {message}")]
    Io { message: String },

    /// Snapshot or config file could not be encoded or parsed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl CoreError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Session storage backend failed to read or write the snapshot
    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

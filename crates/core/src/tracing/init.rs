//! Initialization functions for tracing

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::tracing::config::InstrumentationConfig;

/// Initialize tracing with the given configuration
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &InstrumentationConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    let file_layer = match &config.log_file {
        Some(file_config) => {
            std::fs::create_dir_all(&file_config.directory).with_context(|| {
                format!(
                    "Failed to create log directory: {}",
                    file_config.directory.display()
                )
            })?;

            let path = file_config.path();
            let log_file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(!file_config.truncate)
                .truncate(file_config.truncate)
                .open(&path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(log_file)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    tracing::debug!(
        service = %config.service_name,
        version = %config.service_version,
        "Tracing initialized"
    );

    Ok(())
}

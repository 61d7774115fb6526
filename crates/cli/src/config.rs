//! CLI configuration utilities

use anyhow::{Context, Result};
use portal_core::{PortalConfig, StateDir};
use std::path::{Path, PathBuf};
use tracing::info;

/// Load configuration: an explicit file, else `<config_dir>/portal.json` if it
/// exists, else defaults. `PORTAL_*` environment variables apply on top.
pub fn load_config(explicit: Option<&Path>, state_dir: &StateDir) -> Result<PortalConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(state_dir.config_path()).filter(|path| path.exists()),
    };

    match &path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("Using default configuration with environment overrides"),
    }

    PortalConfig::load(path.as_deref()).context("Failed to load configuration")
}

/// Write the default configuration, returning where it went
pub fn generate_default_config(output: Option<PathBuf>, state_dir: &StateDir) -> Result<PathBuf> {
    let path = output.unwrap_or_else(|| state_dir.config_path());
    PortalConfig::default()
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

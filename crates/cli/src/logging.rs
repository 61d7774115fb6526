use anyhow::Result;
use portal_core::{
    StateDir,
    tracing::{InstrumentationConfig, init_tracing},
};
use tracing::Level;

/// Initialize logging for the CLI
///
/// Long-running commands log to `<data_dir>/logs/<component>.log`, everything
/// else to `cli.log`, in addition to stderr.
pub fn init_logging(
    log_level: Level,
    state_dir: &StateDir,
    component: &str,
    no_file_log: bool,
) -> Result<()> {
    let level = log_level.as_str().to_lowercase();
    let mut config = InstrumentationConfig::stderr(&level);
    config.service_name = format!("portal-{component}");

    if !no_file_log {
        config = config.with_file(state_dir.log_dir(), component);
    }

    init_tracing(&config)
}

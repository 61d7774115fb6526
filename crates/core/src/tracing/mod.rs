//! Tracing setup shared by the CLI and the edge server

pub mod config;
pub mod init;

pub use config::{InstrumentationConfig, LogFileConfig};
pub use init::init_tracing;

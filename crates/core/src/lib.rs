//! Portal core types and utilities
//!
//! Shared by the session crate, the HTTP crate and the CLI: the domain types,
//! the persisted snapshot format, the route guard, form validation and
//! configuration.

pub mod config;
pub mod error;
pub mod guard;
pub mod snapshot;
pub mod state_dir;
pub mod tracing;
pub mod types;
pub mod validation;

pub use config::PortalConfig;
pub use error::{CoreError, CoreResult};
pub use guard::{GuardDecision, RouteGuard};
pub use snapshot::{Rehydrated, SessionSnapshot};
pub use state_dir::StateDir;
pub use types::{RegisterData, TokenPair, User};

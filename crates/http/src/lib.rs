//! Portal HTTP layer
//!
//! The `client` feature provides typed clients for the remote auth API. The
//! `server` feature provides the edge server: the navigation guard reading the
//! persisted session cookie, the `/api/*` rewrite to the remote origin, and
//! static asset serving.

#[cfg(feature = "server")]
#[macro_use]
extern crate tracing;

pub mod error;
pub mod types;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod forwarding;
#[cfg(feature = "server")]
pub mod middleware;
#[cfg(feature = "server")]
pub mod routes;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod state;

pub use error::{HttpError, Result};

#[cfg(feature = "server")]
pub use forwarding::Forwarder;
#[cfg(feature = "server")]
pub use server::{build_router, serve};
#[cfg(feature = "server")]
pub use state::AppState;

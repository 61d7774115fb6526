//! Middleware components for HTTP request processing

pub mod guard;

pub use guard::{guard_middleware, session_cookie};

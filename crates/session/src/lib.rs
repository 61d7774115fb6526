//! Client-side session lifecycle for Portal
//!
//! [`SessionStore`] holds the session and talks to the auth API,
//! [`RefreshScheduler`] keeps tokens fresh, [`AuthenticatedRequester`] retries
//! once through a refresh when the API answers 401, and [`AuthProvider`] ties
//! a store and its scheduler to one scope.

#[macro_use]
extern crate tracing;

pub mod error;
pub mod provider;
pub mod request;
pub mod scheduler;
pub mod storage;
pub mod store;

pub use error::{SessionError, SessionResult};
pub use provider::AuthProvider;
pub use request::{AuthenticatedRequester, RequestOptions};
pub use scheduler::{RefreshScheduler, SchedulerState, refresh_delay};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{SessionState, SessionStore};

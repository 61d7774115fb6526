//! Remote auth API client

pub mod auth;
pub mod error;
pub mod typed;

pub use error::ClientError;
pub use typed::{AuthenticatedApiClient, PublicApiClient, TypedClientBuilder};

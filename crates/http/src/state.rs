//! Shared state for the edge server

use crate::{error::Result, forwarding::Forwarder};
use portal_core::{PortalConfig, RouteGuard};
use std::sync::Arc;

/// State handed to every handler and middleware
#[derive(Clone, Debug)]
pub struct AppState {
    /// Navigation guard built from `guard.*`
    pub guard: Arc<RouteGuard>,
    /// Proxy for `/api/*`
    pub forwarder: Forwarder,
    /// Cookie that carries the persisted session blob
    pub storage_key: Arc<str>,
}

impl AppState {
    pub fn new(config: &PortalConfig) -> Result<Self> {
        Ok(Self {
            guard: Arc::new(RouteGuard::new(config.guard.clone())),
            forwarder: Forwarder::new(&config.proxy, &config.server)?,
            storage_key: Arc::from(config.session.storage_key.as_str()),
        })
    }
}

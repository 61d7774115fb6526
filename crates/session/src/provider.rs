//! Owns a store and its refresh scheduler for the lifetime of one scope

use crate::{
    scheduler::{RefreshScheduler, SchedulerState},
    store::SessionStore,
};
use portal_core::config::SessionConfig;
use std::time::Duration;

#[derive(Debug)]
pub struct AuthProvider {
    store: SessionStore,
    scheduler: RefreshScheduler,
}

impl AuthProvider {
    /// Start the scheduler, first validating a rehydrated session by
    /// refreshing it once when `refresh_on_start` is set
    ///
    /// A rejected session is signed out by the refresh itself.
    #[tracing::instrument(name = "session.mount", skip_all)]
    pub async fn mount(store: SessionStore, config: &SessionConfig) -> Self {
        if config.refresh_on_start && store.has_refresh_token() {
            match store.refresh_token().await {
                Ok(()) => debug!("Stored session is still valid"),
                Err(e) => info!(error = %e, "Stored session rejected"),
            }
        }

        let scheduler =
            RefreshScheduler::spawn(store.clone(), Duration::from_secs(config.refresh_margin_secs));

        Self { store, scheduler }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }

    /// Tear down the scheduler; in-flight network calls are not aborted
    pub fn unmount(self) -> SessionStore {
        self.scheduler.shutdown();
        self.store
    }
}

//! Token refresh scheduler
//!
//! One background task per owning scope. It watches the store's tokens and
//! keeps at most one pending timer, replaced on every token change. When the
//! timer fires it refreshes; a failed refresh signs the session out.

use crate::store::SessionStore;
use portal_core::TokenPair;
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, sleep_until},
};

/// Margin before expiry at which a refresh is attempted
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// `max(lifetime - margin, lifetime / 2)`
pub fn refresh_delay(lifetime: Duration, margin: Duration) -> Duration {
    lifetime.saturating_sub(margin).max(lifetime / 2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No usable token
    Idle,
    /// A refresh is pending
    Scheduled { delay: Duration },
    /// A refresh is in flight
    Firing,
}

/// Handle to the refresh task; dropping it cancels the pending timer
#[derive(Debug)]
pub struct RefreshScheduler {
    task: JoinHandle<()>,
    state: watch::Receiver<SchedulerState>,
}

impl RefreshScheduler {
    /// Start watching `store`; must be called inside a tokio runtime
    pub fn spawn(store: SessionStore, margin: Duration) -> Self {
        let (state_tx, state) = watch::channel(SchedulerState::Idle);
        let tokens = store.subscribe_tokens();
        let task = tokio::spawn(run(store, tokens, margin, state_tx));
        Self { task, state }
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Cancel the pending timer and stop the task
    pub fn shutdown(self) {
        self.task.abort();
        debug!("Refresh scheduler stopped");
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn plan(
    tokens: Option<&TokenPair>,
    margin: Duration,
    state: &watch::Sender<SchedulerState>,
) -> Option<Instant> {
    let lifetime = tokens
        .filter(|t| !t.access_token.is_empty())
        .map(TokenPair::lifetime)
        .filter(|lifetime| !lifetime.is_zero());

    match lifetime {
        Some(lifetime) => {
            let delay = refresh_delay(lifetime, margin);
            debug!(delay_secs = delay.as_secs_f64(), "Scheduled token refresh");
            state.send_replace(SchedulerState::Scheduled { delay });
            // A lifetime past the clock's range never fires
            Instant::now().checked_add(delay)
        }
        None => {
            state.send_replace(SchedulerState::Idle);
            None
        }
    }
}

async fn wait(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn run(
    store: SessionStore,
    mut tokens: watch::Receiver<Option<TokenPair>>,
    margin: Duration,
    state: watch::Sender<SchedulerState>,
) {
    let mut deadline = plan(tokens.borrow_and_update().as_ref(), margin, &state);

    loop {
        tokio::select! {
            changed = tokens.changed() => {
                if changed.is_err() {
                    break;
                }
                deadline = plan(tokens.borrow_and_update().as_ref(), margin, &state);
            }
            () = wait(deadline) => {
                state.send_replace(SchedulerState::Firing);
                deadline = None;

                // Runs inline: a token change cannot cancel a refresh already in flight
                if let Err(e) = store.refresh_token().await {
                    warn!(error = %e, "Scheduled refresh failed, signing out");
                    store.logout().await;
                }

                // New tokens arrive as a change on the next turn
                if !tokens.has_changed().unwrap_or(false) {
                    deadline = plan(tokens.borrow().as_ref(), margin, &state);
                }
            }
        }
    }

    state.send_replace(SchedulerState::Idle);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(secs: u64) -> Duration {
        refresh_delay(Duration::from_secs(secs), DEFAULT_REFRESH_MARGIN)
    }

    #[test]
    fn test_refresh_delay() {
        assert_eq!(delay(600), Duration::from_secs(300));
        assert_eq!(delay(60), Duration::from_secs(30));
        assert_eq!(delay(3600), Duration::from_secs(3300));
        assert_eq!(delay(0), Duration::ZERO);
    }

    #[test]
    fn test_refresh_delay_never_below_half() {
        // 400s: 400 - 300 = 100 < 200
        assert_eq!(delay(400), Duration::from_secs(200));
        assert_eq!(delay(601), Duration::from_secs(301));
        assert_eq!(delay(1), Duration::from_millis(500));
    }
}

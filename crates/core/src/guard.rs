//! Route guard
//!
//! Decides, per navigation and before anything renders, whether a path may be
//! shown given the persisted session snapshot.

use crate::config::GuardConfig;
use crate::snapshot::{Rehydrated, rehydrate};
use crate::types::TokenPair;

/// Outcome of guarding a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the requested path
    Allow,
    /// Send the visitor elsewhere
    Redirect(String),
}

/// Path-based access rules over the persisted session
#[derive(Debug, Clone)]
pub struct RouteGuard {
    config: GuardConfig,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(GuardConfig::default())
    }
}

impl RouteGuard {
    pub fn new(config: GuardConfig) -> Self {
        Self { config }
    }

    pub fn login_path(&self) -> &str {
        &self.config.login_path
    }

    pub fn landing_path(&self) -> &str {
        &self.config.landing_path
    }

    /// Whether the path is reachable without a session
    pub fn is_public(&self, path: &str) -> bool {
        self.config
            .public_paths
            .iter()
            .any(|public| path.starts_with(public.as_str()))
    }

    /// Whether the path is a static asset the guard never inspects
    pub fn is_bypassed(&self, path: &str) -> bool {
        self.config
            .bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    fn is_auth_page(&self, path: &str) -> bool {
        path.starts_with(self.config.auth_prefix.as_str())
    }

    /// Guard a path against a raw persisted blob
    pub fn evaluate(&self, path: &str, persisted: Option<&str>) -> GuardDecision {
        self.decide(path, &rehydrate(persisted))
    }

    /// Guard a path against an already rehydrated snapshot
    pub fn decide(&self, path: &str, session: &Rehydrated) -> GuardDecision {
        if self.is_bypassed(path) {
            return GuardDecision::Allow;
        }

        if self.is_public(path) {
            if session.is_authenticated() && self.is_auth_page(path) {
                return GuardDecision::Redirect(self.config.landing_path.clone());
            }
            return GuardDecision::Allow;
        }

        if session.is_authenticated() {
            GuardDecision::Allow
        } else {
            GuardDecision::Redirect(self.config.login_path.clone())
        }
    }
}

/// In-process check used before authenticated operations
///
/// Stricter than the path guard: the live state must both claim authentication
/// and hold a token pair.
pub fn require_session(is_authenticated: bool, tokens: Option<&TokenPair>) -> bool {
    is_authenticated && tokens.is_some()
}

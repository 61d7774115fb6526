//! Persisted session snapshot
//!
//! The session store writes this blob on every change and the route guard reads
//! it before anything renders. Both go through [`rehydrate`], so there is a
//! single place that decides whether a stored blob counts as a session.

use crate::error::CoreResult;
use crate::types::{TokenPair, User};
use serde::{Deserialize, Serialize};

/// Storage key the snapshot lives under
pub const STORAGE_KEY: &str = "auth-storage";

/// Envelope version written alongside the state
pub const SNAPSHOT_VERSION: u32 = 0;

/// The persisted subset of the session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
    #[serde(rename = "isAuthenticated", default)]
    pub is_authenticated: bool,
}

impl SessionSnapshot {
    /// An authenticated snapshot must carry a token pair
    pub fn is_consistent(&self) -> bool {
        !self.is_authenticated || self.tokens.is_some()
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    state: &'a SessionSnapshot,
    version: u32,
}

#[derive(Deserialize)]
struct Envelope {
    state: SessionSnapshot,
}

/// Result of reading a persisted blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rehydrated {
    /// A well-formed snapshot
    Session(SessionSnapshot),
    /// Nothing stored, or the blob could not be parsed
    Anonymous,
}

impl Rehydrated {
    /// Whether the stored state claims an authenticated session
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Session(snapshot) if snapshot.is_authenticated)
    }

    /// The snapshot if one was recovered
    pub fn into_snapshot(self) -> Option<SessionSnapshot> {
        match self {
            Self::Session(snapshot) => Some(snapshot),
            Self::Anonymous => None,
        }
    }
}

/// Serialize a snapshot into the persisted envelope
pub fn encode(snapshot: &SessionSnapshot) -> CoreResult<String> {
    Ok(serde_json::to_string(&EnvelopeRef {
        state: snapshot,
        version: SNAPSHOT_VERSION,
    })?)
}

/// Parse a persisted blob
///
/// Accepts the raw JSON envelope as well as a percent-encoded one, which is how
/// it arrives when carried in a cookie.
pub fn rehydrate(raw: Option<&str>) -> Rehydrated {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Rehydrated::Anonymous;
    };

    if let Ok(envelope) = serde_json::from_str::<Envelope>(raw) {
        return Rehydrated::Session(envelope.state);
    }

    match urlencoding::decode(raw) {
        Ok(decoded) if decoded != raw => serde_json::from_str::<Envelope>(&decoded)
            .map_or(Rehydrated::Anonymous, |envelope| {
                Rehydrated::Session(envelope.state)
            }),
        _ => Rehydrated::Anonymous,
    }
}

use std::{collections::HashMap, sync::Mutex};

/// Transient state persisted between flow initiation and code exchange:
/// the anti-forgery `state` and, for PKCE flows, the code verifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState {
    pub state: String,
    pub verifier: Option<String>,
}

/// In-memory store for pending authorization state, keyed by session id.
///
/// Written once when a flow begins and consumed exactly once on exchange.
/// Starting a new flow for the same session replaces the previous entry,
/// so only the most recently issued `state` is valid.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, AuthorizationState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pending state for a session, replacing any previous entry.
    pub fn put(&self, session_id: &str, state: AuthorizationState) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.insert(session_id.to_string(), state);
    }

    /// Remove and return the pending state for a session.
    pub fn take(&self, session_id: &str) -> Option<AuthorizationState> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.remove(session_id)
    }
}

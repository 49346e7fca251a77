// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Mutex;

/// Tracks, per user, which session id and agent are currently active.
///
/// The orchestrator adapter needs to know whether a user already has an
/// active session and which agent owns it before it can decide, but
/// `vesper_session::SessionManager` is keyed by session id, not user id, and
/// has no "active agent for this user" query. This small index is adapter-
/// layer bookkeeping, updated by the agent adapter whenever it creates,
/// parks (`wait_for_input`), or completes a session.
#[derive(Default)]
pub struct ActiveSessionIndex {
    inner: Mutex<HashMap<String, (String, String)>>,
}

impl ActiveSessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: &str, session_id: &str, agent_name: &str) {
        self.inner
            .lock()
            .expect("active session index mutex poisoned")
            .insert(user_id.to_string(), (session_id.to_string(), agent_name.to_string()));
    }

    pub fn clear(&self, user_id: &str) {
        self.inner.lock().expect("active session index mutex poisoned").remove(user_id);
    }

    pub fn get(&self, user_id: &str) -> Option<(String, String)> {
        self.inner.lock().expect("active session index mutex poisoned").get(user_id).cloned()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

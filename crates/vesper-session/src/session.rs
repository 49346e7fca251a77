// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Running,
    WaitingInput,
    Paused,
    Completed,
    Error,
}

/// One agent's slice of conversational state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    pub session_id: String,
    pub agent_name: String,
    pub user_id: String,
    pub priority: u8,
    pub interruptible: bool,
    pub state: SessionState,
    pub context: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub prompt: Option<String>,
    pub expected_input_type: Option<String>,
}

impl AgentSession {
    pub(crate) fn new(agent_name: String, user_id: String, priority: u8, interruptible: bool) -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            agent_name,
            user_id,
            priority,
            interruptible,
            state: SessionState::Running,
            context: HashMap::new(),
            created_at: now,
            last_activity_at: now,
            prompt: None,
            expected_input_type: None,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity_at
    }
}

/// Per-user stack: at most one non-paused session plus an ordered list of
/// paused sessions, newest push at the back (the "top").
#[derive(Debug, Default, Clone)]
pub struct SessionStack {
    pub(crate) active: Option<AgentSession>,
    pub(crate) paused: Vec<AgentSession>,
}

impl SessionStack {
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.paused.is_empty()
    }

    pub fn active(&self) -> Option<&AgentSession> {
        self.active.as_ref()
    }

    pub fn paused(&self) -> &[AgentSession] {
        &self.paused
    }
}

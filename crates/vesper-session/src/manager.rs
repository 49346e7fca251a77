// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;
use tracing::{info, warn};
use vesper_core::{Event, EventBus, EventKind, EventPayload, SessionAction, SessionAware};

use crate::session::{AgentSession, SessionState, SessionStack};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("refused: an existing session has priority")]
    Refused,
    #[error("session not found")]
    NotFound,
    #[error("session is not at the top of its user's stack")]
    NotTop,
    #[error("session is not the active session for its user")]
    NotActive,
    #[error("session is not waiting for input")]
    NotWaitingInput,
}

/// What `complete` produced, so the caller knows whether to re-invoke an
/// agent for a session it just resumed.
#[derive(Debug, Clone)]
pub struct CompleteOutcome {
    pub completed: AgentSession,
    pub resumed: Option<AgentSession>,
}

/// Owns one [`SessionStack`] per user behind its own lock, so that users
/// never contend with each other.
pub struct SessionManager {
    stacks: Mutex<HashMap<String, Arc<Mutex<SessionStack>>>>,
    index: Mutex<HashMap<String, String>>,
    ttl: Duration,
    bus: Option<Arc<EventBus>>,
}

impl SessionManager {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            stacks: Mutex::new(HashMap::new()),
            index: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
            bus: None,
        }
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn stack_for(&self, user_id: &str) -> Arc<Mutex<SessionStack>> {
        self.stacks
            .lock()
            .expect("session stacks mutex poisoned")
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionStack::default())))
            .clone()
    }

    fn index_user(&self, session_id: &str) -> Option<String> {
        self.index.lock().expect("session index mutex poisoned").get(session_id).cloned()
    }

    /// Implements the creation/preemption decision table: a waiting-input
    /// session is always preempted; otherwise only a strictly higher
    /// priority, interruptible existing session is preempted.
    pub fn create(&self, agent_name: &str, user_id: &str, priority: u8, interruptible: bool) -> Option<AgentSession> {
        let stack_arc = self.stack_for(user_id);
        let mut stack = stack_arc.lock().expect("session stack mutex poisoned");

        let new_session = AgentSession::new(agent_name.to_string(), user_id.to_string(), priority, interruptible);

        let should_preempt = match &stack.active {
            None => true,
            Some(existing) if existing.state == SessionState::WaitingInput => true,
            Some(existing) if new_session.priority > existing.priority && existing.interruptible => true,
            Some(_) => false,
        };

        if !should_preempt {
            warn!(user_id, agent_name, "session creation refused, existing session has priority");
            return None;
        }

        if let Some(mut existing) = stack.active.take() {
            existing.state = SessionState::Paused;
            self.index.lock().expect("session index mutex poisoned").insert(existing.session_id.clone(), user_id.to_string());
            stack.paused.push(existing);
        }

        self.index
            .lock()
            .expect("session index mutex poisoned")
            .insert(new_session.session_id.clone(), user_id.to_string());
        stack.active = Some(new_session.clone());
        info!(session_id = %new_session.session_id, agent_name, user_id, "session created");
        Some(new_session)
    }

    pub fn wait_for_input(&self, session_id: &str, prompt: &str, expected_input_type: Option<&str>) -> Result<AgentSession, SessionError> {
        let user_id = self.index_user(session_id).ok_or(SessionError::NotFound)?;
        let stack_arc = self.stack_for(&user_id);
        let mut stack = stack_arc.lock().expect("session stack mutex poisoned");
        let active = stack.active.as_mut().ok_or(SessionError::NotActive)?;
        if active.session_id != session_id {
            return Err(SessionError::NotActive);
        }
        active.state = SessionState::WaitingInput;
        active.prompt = Some(prompt.to_string());
        active.expected_input_type = expected_input_type.map(str::to_string);
        active.touch();
        Ok(active.clone())
    }

    /// Marks the top of the user's stack running again. The "top" is the
    /// active slot when occupied, else the most recently paused session.
    pub fn resume(&self, session_id: &str, _query: &str) -> Result<AgentSession, SessionError> {
        let user_id = self.index_user(session_id).ok_or(SessionError::NotFound)?;
        let stack_arc = self.stack_for(&user_id);
        let mut stack = stack_arc.lock().expect("session stack mutex poisoned");

        if let Some(active) = stack.active.as_mut() {
            if active.session_id != session_id {
                return Err(SessionError::NotTop);
            }
            active.state = SessionState::Running;
            active.touch();
            return Ok(active.clone());
        }

        match stack.paused.last() {
            Some(top) if top.session_id == session_id => {
                let mut resumed = stack.paused.pop().expect("checked non-empty above");
                resumed.state = SessionState::Running;
                resumed.touch();
                stack.active = Some(resumed.clone());
                Ok(resumed)
            }
            Some(_) => Err(SessionError::NotTop),
            None => Err(SessionError::NotFound),
        }
    }

    /// Marks the active session terminal and, if the stack is non-empty,
    /// promotes the top paused session to running. The caller is responsible
    /// for re-invoking that agent with its stored context.
    pub fn complete(&self, session_id: &str) -> Result<CompleteOutcome, SessionError> {
        let user_id = self.index_user(session_id).ok_or(SessionError::NotFound)?;
        let stack_arc = self.stack_for(&user_id);
        let mut stack = stack_arc.lock().expect("session stack mutex poisoned");

        let mut active = stack.active.take().ok_or(SessionError::NotActive)?;
        if active.session_id != session_id {
            let restore = active;
            stack.active = Some(restore);
            return Err(SessionError::NotActive);
        }
        active.state = SessionState::Completed;
        self.index.lock().expect("session index mutex poisoned").remove(session_id);

        let resumed = stack.paused.pop().map(|mut next| {
            next.state = SessionState::Running;
            next.touch();
            stack.active = Some(next.clone());
            next
        });

        info!(session_id, resumed = resumed.as_ref().map(|s| s.session_id.as_str()), "session completed");
        Ok(CompleteOutcome { completed: active, resumed })
    }

    pub fn get(&self, session_id: &str) -> Option<AgentSession> {
        let user_id = self.index_user(session_id)?;
        let stack_arc = self.stack_for(&user_id);
        let stack = stack_arc.lock().expect("session stack mutex poisoned");
        if let Some(active) = &stack.active {
            if active.session_id == session_id {
                return Some(active.clone());
            }
        }
        stack.paused.iter().find(|s| s.session_id == session_id).cloned()
    }

    /// Reaps sessions idle past the configured TTL. Runs once per sweep
    /// interval from `spawn_ttl_sweeper`.
    fn sweep_once(&self) {
        let now = chrono::Utc::now();
        let stacks = self.stacks.lock().expect("session stacks mutex poisoned").clone();
        for (user_id, stack_arc) in stacks {
            let mut expired = Vec::new();
            {
                let mut stack = stack_arc.lock().expect("session stack mutex poisoned");
                if let Some(active) = &stack.active {
                    if active.idle_for(now) > self.ttl {
                        let mut dead = stack.active.take().expect("checked Some above");
                        dead.state = SessionState::Error;
                        self.index.lock().expect("session index mutex poisoned").remove(&dead.session_id);
                        expired.push(dead);
                    }
                }
                stack.paused.retain(|s| {
                    if s.idle_for(now) > self.ttl {
                        expired.push({
                            let mut dead = s.clone();
                            dead.state = SessionState::Error;
                            dead
                        });
                        false
                    } else {
                        true
                    }
                });
            }
            for dead in &expired {
                self.index.lock().expect("session index mutex poisoned").remove(&dead.session_id);
                warn!(session_id = %dead.session_id, user_id, "session expired");
                if let Some(bus) = &self.bus {
                    let event = Event::new(EventKind::SessionExpired, "vesper-session", EventPayload::Empty)
                        .with_session(SessionAware { session_id: dead.session_id.clone(), action: SessionAction::Complete });
                    let bus = bus.clone();
                    tokio::spawn(async move {
                        let _ = bus.publish(event).await;
                    });
                }
            }
        }
    }

    /// Spawns the background TTL sweeper. Returns its `JoinHandle` so the
    /// caller (the controller) can abort it on shutdown.
    pub fn spawn_ttl_sweeper(self: &Arc<Self>, interval: StdDuration) -> tokio::task::JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                manager.sweep_once();
            }
        })
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

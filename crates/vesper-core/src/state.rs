// SPDX-License-Identifier: Apache-2.0
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Process-wide pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineState {
    Idle,
    WakeDetected,
    Listening,
    Recognizing,
    Deciding,
    Executing,
    Error,
}

/// The enumerated state events that drive transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    WakewordTriggered,
    SpeechStart,
    SpeechEnd,
    RecognitionStart,
    RecognitionSuccess,
    RecognitionFailed,
    OrchestratorDecided,
    AgentCompleted,
    Error,
    Reset,
}

/// `(current_state, state_event) → next_state` transition table.
/// Unknown transitions are rejected: the state is unchanged and a warning
/// is logged.
fn transition(current: PipelineState, event: StateEvent) -> Option<PipelineState> {
    use PipelineState::*;
    use StateEvent::*;
    match (current, event) {
        (_, Reset) => Some(Idle),
        (_, Error) => Some(PipelineState::Error),
        (Idle, WakewordTriggered) => Some(WakeDetected),
        (WakeDetected, SpeechStart) => Some(Listening),
        (Listening, SpeechEnd) => Some(Recognizing),
        (Recognizing, RecognitionStart) => Some(Recognizing),
        (Recognizing, RecognitionSuccess) => Some(Deciding),
        (Recognizing, RecognitionFailed) => Some(Idle),
        (Deciding, OrchestratorDecided) => Some(Executing),
        (Executing, AgentCompleted) => Some(Idle),
        _ => None,
    }
}

/// Thread-safe holder of the single process-wide [`PipelineState`].
///
/// `apply` is the only mutator; it returns `Some((from, to, reason))` when
/// the transition was accepted, so the caller (an adapter, normally) can
/// publish the resulting `state_change` event.
pub struct StateMachine {
    current: Mutex<PipelineState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(PipelineState::Idle),
        }
    }

    pub fn current(&self) -> PipelineState {
        *self.current.lock().expect("state machine mutex poisoned")
    }

    /// Apply a state event. Returns `Some((from, to, reason))` on an
    /// accepted transition; `None` (and logs a warning) on a rejected one,
    /// leaving the current state untouched.
    pub fn apply(&self, event: StateEvent, reason: &str) -> Option<(PipelineState, PipelineState, String)> {
        let mut guard = self.current.lock().expect("state machine mutex poisoned");
        let from = *guard;
        match transition(from, event) {
            Some(to) => {
                *guard = to;
                Some((from, to, reason.to_string()))
            }
            None => {
                warn!(?from, ?event, "rejected state transition");
                None
            }
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

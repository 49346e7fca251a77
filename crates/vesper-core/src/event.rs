// SPDX-License-Identifier: Apache-2.0
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::PipelineState;

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Next value in the process-wide monotonic sequence used as `Event::seq`.
///
/// Wall-clock time is not monotonic across NTP adjustments, so the bus
/// stamps every event with both a monotonically increasing counter
/// (ordering) and a wall-clock `DateTime<Utc>` (display/logging) — handlers
/// that need a strict per-correlation-id order should compare `seq`, not
/// `timestamp`.
pub fn next_seq() -> u64 {
    SEQ.fetch_add(1, Ordering::Relaxed)
}

/// The kind of an event on the bus. Determines which [`EventPayload`]
/// variant a subscriber may expect: the payload variant is always
/// determined by the event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    AudioFrameReady,
    WakewordDetected,
    VadSpeechStart,
    VadSpeechEnd,
    AsrRecognitionStart,
    AsrRecognitionSuccess,
    AsrRecognitionFailed,
    StateChange,
    OrchestratorDecided,
    AgentDispatchRequest,
    AgentResponse,
    TtsSpeakRequest,
    TtsSpeakDone,
    SessionExpired,
}

/// Every event kind that participates in a multi-turn dialogue carries one
/// of these alongside its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAware {
    pub session_id: String,
    pub action: SessionAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    New,
    Resume,
    Complete,
}

/// One raw audio frame. Bypasses the generic bus and is delivered directly
/// to frame consumers.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub seq: u64,
    pub samples: Arc<[i16]>,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakewordHit {
    pub keyword: String,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub enum VadBoundary {
    Start,
    /// Carries the captured speech blob.
    End { audio: Arc<[u8]> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrSuccess {
    pub text: String,
    pub confidence: f32,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrFailure {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangePayload {
    pub from: PipelineState,
    pub to: PipelineState,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDispatchRequest {
    pub user_id: String,
    pub query: String,
    /// The agent the orchestrator selected or resumed.
    pub agent: String,
}

/// `session_id` is filled by the adapter, never by the agent itself — the
/// agent runtime has no session-manager dependency of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub agent: String,
    pub query: String,
    pub status: AgentResponseStatus,
    pub message: String,
    pub prompt: Option<String>,
    pub data: Option<serde_json::Value>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentResponseStatus {
    Success,
    WaitingInput,
    Completed,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSpeakRequest {
    pub text: String,
}

/// The typed payload carried by an [`Event`]. Selecting on [`EventKind`]
/// guarantees the matching variant.
#[derive(Debug, Clone)]
pub enum EventPayload {
    AudioFrame(AudioFrame),
    WakewordHit(WakewordHit),
    VadBoundary(VadBoundary),
    AsrSuccess(AsrSuccess),
    AsrFailure(AsrFailure),
    StateChange(StateChangePayload),
    AgentDispatchRequest(AgentDispatchRequest),
    AgentResponse(AgentResponse),
    TtsSpeakRequest(TtsSpeakRequest),
    Empty,
}

/// One bus event: kind, source, timing, optional correlation id, typed
/// payload, and an optional session-aware stamp.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub source: &'static str,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub session: Option<SessionAware>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(kind: EventKind, source: &'static str, payload: EventPayload) -> Self {
        Self {
            kind,
            source,
            seq: next_seq(),
            timestamp: Utc::now(),
            correlation_id: None,
            session: None,
            payload,
        }
    }

    pub fn with_correlation(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn with_session(mut self, session: SessionAware) -> Self {
        self.session = Some(session);
        self
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }

    #[test]
    fn event_new_has_no_correlation_by_default() {
        let ev = Event::new(EventKind::WakewordDetected, "wakeword", EventPayload::Empty);
        assert!(ev.correlation_id.is_none());
        assert!(ev.session.is_none());
    }

    #[test]
    fn with_correlation_sets_id() {
        let id = Uuid::new_v4();
        let ev = Event::new(EventKind::AsrRecognitionSuccess, "asr", EventPayload::Empty)
            .with_correlation(id);
        assert_eq!(ev.correlation_id, Some(id));
    }

    #[test]
    fn with_session_sets_session_aware_payload() {
        let ev = Event::new(EventKind::AgentDispatchRequest, "orchestrator", EventPayload::Empty)
            .with_session(SessionAware {
                session_id: "s1".into(),
                action: SessionAction::New,
            });
        assert_eq!(ev.session.unwrap().action, SessionAction::New);
    }
}

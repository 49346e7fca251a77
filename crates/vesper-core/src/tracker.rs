// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One stage entry in a [`MessageTrace`].
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceStatus {
    InProgress,
    WaitingInput,
    Completed,
    Failed,
    Aborted,
}

/// Per-utterance correlation record. Keyed by a correlation id created at
/// ASR success; mutated only by appends; readable concurrently by the
/// evaluator.
#[derive(Debug, Clone)]
pub struct MessageTrace {
    pub id: Uuid,
    pub query: String,
    pub entries: Vec<TraceEntry>,
    pub response: Option<String>,
    pub status: TraceStatus,
}

impl MessageTrace {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            query: String::new(),
            entries: Vec::new(),
            response: None,
            status: TraceStatus::InProgress,
        }
    }

    /// Stage names in append order. Used only by tests / the evaluator to
    /// assert ordering; not enforced at append time since a given utterance
    /// may skip stages (e.g. `recognition_failed` never reaches
    /// `orchestrator_decision`).
    pub fn stage_sequence(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.stage.as_str()).collect()
    }
}

/// Per-utterance correlation and audit log.
///
/// `create_message_id` returns a fresh id; `add_trace` appends a stage
/// entry; `update_query`/`update_response` set the canonical fields;
/// `get_trace` reads a snapshot. Concurrent appends to distinct ids proceed
/// independently in spirit but are serialized behind one coarse mutex here —
/// a single short-held lock over the whole table rather than a lock per
/// entry, since trace entries are small and appends are not
/// latency-critical.
pub struct MessageTracker {
    traces: Mutex<HashMap<Uuid, MessageTrace>>,
}

impl MessageTracker {
    pub fn new() -> Self {
        Self {
            traces: Mutex::new(HashMap::new()),
        }
    }

    pub fn create_message_id(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.traces
            .lock()
            .expect("tracker mutex poisoned")
            .insert(id, MessageTrace::new(id));
        id
    }

    pub fn add_trace(&self, id: Uuid, stage: impl Into<String>, input: impl Into<String>, output: impl Into<String>) {
        let mut traces = self.traces.lock().expect("tracker mutex poisoned");
        if let Some(trace) = traces.get_mut(&id) {
            trace.entries.push(TraceEntry {
                stage: stage.into(),
                timestamp: Utc::now(),
                input: input.into(),
                output: output.into(),
            });
        }
    }

    pub fn update_query(&self, id: Uuid, query: impl Into<String>) {
        let mut traces = self.traces.lock().expect("tracker mutex poisoned");
        if let Some(trace) = traces.get_mut(&id) {
            trace.query = query.into();
        }
    }

    pub fn update_response(&self, id: Uuid, response: impl Into<String>) {
        let mut traces = self.traces.lock().expect("tracker mutex poisoned");
        if let Some(trace) = traces.get_mut(&id) {
            trace.response = Some(response.into());
        }
    }

    pub fn set_status(&self, id: Uuid, status: TraceStatus) {
        let mut traces = self.traces.lock().expect("tracker mutex poisoned");
        if let Some(trace) = traces.get_mut(&id) {
            trace.status = status;
        }
    }

    /// Mark an in-flight trace aborted. Used by adapters on `stop`, so
    /// unfinished traces don't linger as `in_progress` after shutdown.
    pub fn mark_aborted(&self, id: Uuid) {
        self.set_status(id, TraceStatus::Aborted);
    }

    /// Sets the final status for a trace that has reached the end of the
    /// pipeline (spoken successfully or failed), named for the caller's
    /// intent rather than the generic `set_status` it wraps.
    pub fn finalize(&self, id: Uuid, status: TraceStatus) {
        self.set_status(id, status);
    }

    pub fn get_trace(&self, id: Uuid) -> Option<MessageTrace> {
        self.traces.lock().expect("tracker mutex poisoned").get(&id).cloned()
    }

    pub fn is_terminal(&self, id: Uuid) -> bool {
        self.get_trace(id)
            .map(|t| matches!(t.status, TraceStatus::Completed | TraceStatus::Failed | TraceStatus::Aborted))
            .unwrap_or(false)
    }
}

impl Default for MessageTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

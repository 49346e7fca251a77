// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Whether the utterance continues the active session or starts fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Route back to the active session's agent.
    Resume,
    /// Select an agent afresh; the session manager decides whether this
    /// preempts the active session.
    New,
}

/// Output of the orchestrator: `{selected_agent, confidence, reasoning,
/// parameters}` plus the resume/new classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorDecision {
    pub selected_agent: String,
    pub confidence: f32,
    pub reasoning: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub action: RouteAction,
}

impl OrchestratorDecision {
    pub fn new_intent(agent: impl Into<String>, confidence: f32, reasoning: impl Into<String>) -> Self {
        Self { selected_agent: agent.into(), confidence, reasoning: reasoning.into(), parameters: serde_json::Value::Null, action: RouteAction::New }
    }

    pub fn resume(agent: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self { selected_agent: agent.into(), confidence: 1.0, reasoning: reasoning.into(), parameters: serde_json::Value::Null, action: RouteAction::Resume }
    }
}

/// What the orchestrator is deciding against: the utterance, the user's
/// active session (if any), and the agent roster it may choose from.
#[derive(Debug, Clone)]
pub struct OrchestratorContext<'a> {
    pub query: &'a str,
    pub user_id: &'a str,
    pub active_session_agent: Option<&'a str>,
    pub agents: &'a [vesper_config::AgentConfig],
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

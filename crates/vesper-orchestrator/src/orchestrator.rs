// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use vesper_config::AgentConfig;
use vesper_model::{CompletionRequest, Message, ModelProvider};

use crate::decision::{OrchestratorContext, OrchestratorDecision, RouteAction};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("no agents configured")]
    NoAgentsConfigured,
}

/// Selects an agent for an utterance and classifies continuation-vs-new-intent
/// against an active session.
pub struct Orchestrator {
    model: Arc<dyn ModelProvider>,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ModelProvider>) -> Self {
        Self { model }
    }

    pub async fn decide(&self, ctx: OrchestratorContext<'_>) -> Result<OrchestratorDecision, OrchestratorError> {
        if ctx.agents.is_empty() {
            return Err(OrchestratorError::NoAgentsConfigured);
        }

        match ctx.active_session_agent {
            Some(active_agent) => Ok(self.decide_with_active_session(ctx, active_agent).await),
            None => Ok(self.select_fresh(ctx).await),
        }
    }

    /// Classify the utterance as answer-to-pending or new-intent against
    /// the active session. An LLM call drives the classification when
    /// available;
    /// keyword evidence for a *different* agent is the rule-based fallback
    /// signal that the utterance is a new intent rather than an answer.
    async fn decide_with_active_session(&self, ctx: OrchestratorContext<'_>, active_agent: &str) -> OrchestratorDecision {
        let prompt = format!(
            "The user has an active conversation with agent \"{active_agent}\". They just said: \"{}\".\n\
             Is this an answer to that agent's pending question, or a new, unrelated request?\n\
             Respond with JSON: {{\"is_new_intent\": bool, \"reasoning\": string}}.",
            ctx.query
        );
        let request = CompletionRequest { messages: vec![Message::system("You classify conversational turns."), Message::user(prompt)], want_json: true, ..Default::default() };

        let is_new_intent = match self.model.complete(request).await {
            Ok(response) => match serde_json::from_str::<serde_json::Value>(&response.text) {
                Ok(value) => value.get("is_new_intent").and_then(serde_json::Value::as_bool).unwrap_or(false),
                Err(_) => rule_based_is_new_intent(ctx.query, active_agent, ctx.agents),
            },
            Err(err) => {
                warn!(error = %err, "llm_call_failed classifying active session continuation, falling back to keyword rule");
                rule_based_is_new_intent(ctx.query, active_agent, ctx.agents)
            }
        };

        if is_new_intent {
            let mut decision = self.select_fresh_sync(ctx.query, ctx.agents);
            decision.action = RouteAction::New;
            decision
        } else {
            OrchestratorDecision::resume(active_agent, "classified as an answer to the active session's pending prompt")
        }
    }

    /// Pure agent selection, used when there is no active session.
    async fn select_fresh(&self, ctx: OrchestratorContext<'_>) -> OrchestratorDecision {
        let agent_list = describe_agents(ctx.agents);
        let prompt = format!(
            "Available agents:\n{agent_list}\n\nUser request: \"{}\"\n\n\
             Pick the single best agent. Respond with JSON: \
             {{\"selected_agent\": string, \"confidence\": number between 0 and 1, \"reasoning\": string}}.",
            ctx.query
        );
        let request = CompletionRequest { messages: vec![Message::system("You route user requests to the best-fit agent."), Message::user(prompt)], want_json: true, ..Default::default() };

        match self.model.complete(request).await {
            Ok(response) => match parse_selection(&response.text, ctx.agents) {
                Some(decision) => {
                    info!(agent = %decision.selected_agent, "orchestrator selected agent via LLM");
                    decision
                }
                None => {
                    warn!("llm selection response malformed or named an unknown agent, falling back to keyword rule");
                    self.select_fresh_sync(ctx.query, ctx.agents)
                }
            },
            Err(err) => {
                warn!(error = %err, "llm_call_failed selecting agent, falling back to keyword rule");
                self.select_fresh_sync(ctx.query, ctx.agents)
            }
        }
    }

    fn select_fresh_sync(&self, query: &str, agents: &[AgentConfig]) -> OrchestratorDecision {
        rule_based_select(query, agents)
    }
}

fn describe_agents(agents: &[AgentConfig]) -> String {
    agents.iter().map(|a| format!("- {} (capabilities: {})", a.name, a.capabilities.join(", "))).collect::<Vec<_>>().join("\n")
}

fn parse_selection(text: &str, agents: &[AgentConfig]) -> Option<OrchestratorDecision> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let selected_agent = value.get("selected_agent").and_then(serde_json::Value::as_str)?.to_string();
    if !agents.iter().any(|a| a.name == selected_agent) {
        return None;
    }
    let confidence = value.get("confidence").and_then(serde_json::Value::as_f64).unwrap_or(0.5) as f32;
    let reasoning = value.get("reasoning").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
    Some(OrchestratorDecision::new_intent(selected_agent, confidence, reasoning))
}

/// Rule-based fallback: picks by keyword match against capabilities,
/// defaulting to `chat_agent`.
fn rule_based_select(query: &str, agents: &[AgentConfig]) -> OrchestratorDecision {
    let lowered = query.to_lowercase();
    for agent in agents {
        if agent.enabled && agent.capabilities.iter().any(|cap| lowered.contains(&cap.to_lowercase())) {
            return OrchestratorDecision::new_intent(agent.name.clone(), 0.5, "keyword match against capabilities");
        }
    }
    let fallback = AgentConfig::fallback_name();
    if agents.iter().any(|a| a.name == fallback) {
        OrchestratorDecision::new_intent(fallback, 0.1, "no capability keyword matched, default fallback")
    } else {
        OrchestratorDecision::new_intent(agents[0].name.clone(), 0.1, "no capability keyword matched and no chat_agent configured, first agent used")
    }
}

fn rule_based_is_new_intent(query: &str, active_agent: &str, agents: &[AgentConfig]) -> bool {
    let decision = rule_based_select(query, agents);
    decision.selected_agent != active_agent && decision.confidence > 0.1
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use vesper_config::AgentConfig;
use vesper_core::{Adapter, AdapterError, AdapterStats, AgentDispatchRequest, AsrSuccess, Event, EventBus, EventHandler, EventKind, EventPayload, StateEvent, StateMachine};
use vesper_orchestrator::Orchestrator;

use crate::active_session_index::ActiveSessionIndex;

/// On `asr_recognition_success`, calls the orchestrator and emits a
/// session-aware `agent_dispatch_request`.
///
/// The pipeline carries no notion of distinct speakers yet — no cross-user
/// ordering is assumed — so every utterance is attributed to one configured
/// local user.
pub struct OrchestratorAdapter {
    orchestrator: Orchestrator,
    bus: Arc<EventBus>,
    state_machine: Arc<StateMachine>,
    active_sessions: Arc<ActiveSessionIndex>,
    agents: Vec<AgentConfig>,
    user_id: String,
    stats: Mutex<AdapterStats>,
}

impl OrchestratorAdapter {
    pub fn new(orchestrator: Orchestrator, bus: Arc<EventBus>, state_machine: Arc<StateMachine>, active_sessions: Arc<ActiveSessionIndex>, agents: Vec<AgentConfig>, user_id: impl Into<String>) -> Self {
        Self { orchestrator, bus, state_machine, active_sessions, agents, user_id: user_id.into(), stats: Mutex::new(AdapterStats::default()) }
    }
}

#[async_trait]
impl EventHandler for OrchestratorAdapter {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let success = match &event.payload {
            EventPayload::AsrSuccess(s) => s.clone(),
            _ => return Ok(()),
        };
        let AsrSuccess { text, .. } = success;

        let active = self.active_sessions.get(&self.user_id);
        let ctx = vesper_orchestrator::OrchestratorContext {
            query: &text,
            user_id: &self.user_id,
            active_session_agent: active.as_ref().map(|(_, agent)| agent.as_str()),
            agents: &self.agents,
        };

        match self.orchestrator.decide(ctx).await {
            Ok(decision) => {
                self.state_machine.apply(StateEvent::OrchestratorDecided, "orchestrator decided");
                self.stats.lock().expect("orchestrator adapter stats mutex poisoned").record(0.0, false);

                let mut dispatch = Event::new(
                    EventKind::AgentDispatchRequest,
                    "orchestrator",
                    EventPayload::AgentDispatchRequest(AgentDispatchRequest { user_id: self.user_id.clone(), query: text, agent: decision.selected_agent }),
                );
                if let Some(id) = event.correlation_id {
                    dispatch = dispatch.with_correlation(id);
                }
                if let Some((session_id, _)) = &active {
                    dispatch = dispatch.with_session(vesper_core::SessionAware {
                        session_id: session_id.clone(),
                        action: match decision.action {
                            vesper_orchestrator::RouteAction::Resume => vesper_core::SessionAction::Resume,
                            vesper_orchestrator::RouteAction::New => vesper_core::SessionAction::New,
                        },
                    });
                }
                self.bus.publish(dispatch).await;
            }
            Err(err) => {
                self.stats.lock().expect("orchestrator adapter stats mutex poisoned").record(0.0, true);
                tracing::warn!(error = %err, "orchestrator decision failed, dropping utterance");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Adapter for OrchestratorAdapter {
    fn name(&self) -> &str {
        "orchestrator"
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        if self.agents.is_empty() {
            return Err(AdapterError::ConfigInvalid("no agents configured".into()));
        }
        Ok(())
    }

    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn statistics(&self) -> AdapterStats {
        self.stats.lock().expect("orchestrator adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_model::ScriptedMockProvider;

    fn agents() -> Vec<AgentConfig> {
        vec![AgentConfig { name: "music_agent".into(), description: String::new(), priority: 50, interruptible: true, enabled: true, capabilities: vec!["music".into()] }]
    }

    fn success_event(text: &str) -> Event {
        Event::new(EventKind::AsrRecognitionSuccess, "asr", EventPayload::AsrSuccess(AsrSuccess { text: text.into(), confidence: 0.9, latency_ms: 10 }))
    }

    #[tokio::test]
    async fn dispatches_with_selected_agent_and_no_session_for_fresh_utterance() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        sm.apply(StateEvent::WakewordTriggered, "w");
        sm.apply(StateEvent::SpeechStart, "s");
        sm.apply(StateEvent::SpeechEnd, "e");
        sm.apply(StateEvent::RecognitionSuccess, "ok");

        let orchestrator = Orchestrator::new(Arc::new(ScriptedMockProvider::always_text(r#"{"selected_agent":"music_agent","confidence":0.9,"reasoning":"music"}"#)));
        let adapter = OrchestratorAdapter::new(orchestrator, bus.clone(), sm.clone(), Arc::new(ActiveSessionIndex::new()), agents(), "local_user");

        let captured: Arc<Mutex<Option<AgentDispatchRequest>>> = Arc::new(Mutex::new(None));
        struct Capture(Arc<Mutex<Option<AgentDispatchRequest>>>);
        #[async_trait]
        impl EventHandler for Capture {
            async fn handle(&self, event: Event) -> anyhow::Result<()> {
                if let EventPayload::AgentDispatchRequest(req) = event.payload {
                    *self.0.lock().unwrap() = Some(req);
                }
                Ok(())
            }
        }
        bus.subscribe(EventKind::AgentDispatchRequest, Arc::new(Capture(captured.clone())), vesper_core::Dispatch::Fast);

        adapter.handle(success_event("play some jazz")).await.unwrap();
        let req = captured.lock().unwrap().clone().expect("dispatch request published");
        assert_eq!(req.agent, "music_agent");
        assert_eq!(sm.current(), vesper_core::PipelineState::Executing);
    }
}

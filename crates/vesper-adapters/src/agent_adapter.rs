// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use vesper_config::AgentConfig;
use vesper_core::{
    Adapter, AdapterError, AdapterStats, AgentDispatchRequest, AgentResponseStatus, Event, EventBus, EventHandler, EventKind, EventPayload, MessageTracker,
    SessionAction, SessionAware, TraceStatus, TtsSpeakRequest,
};
use vesper_memory::MemoryStore;
use vesper_runtime::{Agent, AgentContext, AgentRuntime};
use vesper_session::{SessionError, SessionManager};

use crate::active_session_index::ActiveSessionIndex;

/// Reads the agent's priority/interruptible from config, asks the session
/// manager to create/resume a session, invokes the agent runtime, then
/// either stamps the session id and calls `wait_for_input`, or calls
/// `complete`, emits `agent_response`, and requests TTS.
pub struct AgentAdapter {
    agents: HashMap<String, Agent>,
    agent_configs: HashMap<String, AgentConfig>,
    runtime: Arc<AgentRuntime>,
    sessions: Arc<SessionManager>,
    active_sessions: Arc<ActiveSessionIndex>,
    contexts: Mutex<HashMap<String, AgentContext>>,
    bus: Arc<EventBus>,
    tracker: Arc<MessageTracker>,
    memory: Arc<MemoryStore>,
    stats: Mutex<AdapterStats>,
}

impl AgentAdapter {
    pub fn new(
        agents: HashMap<String, Agent>,
        agent_configs: Vec<AgentConfig>,
        runtime: Arc<AgentRuntime>,
        sessions: Arc<SessionManager>,
        active_sessions: Arc<ActiveSessionIndex>,
        bus: Arc<EventBus>,
        tracker: Arc<MessageTracker>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        let agent_configs = agent_configs.into_iter().map(|c| (c.name.clone(), c)).collect();
        Self { agents, agent_configs, runtime, sessions, active_sessions, contexts: Mutex::new(HashMap::new()), bus, tracker, memory, stats: Mutex::new(AdapterStats::default()) }
    }

    fn take_context(&self, session_id: &str, user_id: &str) -> AgentContext {
        self.contexts.lock().expect("agent adapter contexts mutex poisoned").remove(session_id).unwrap_or_else(|| AgentContext::new(user_id))
    }

    fn store_context(&self, session_id: &str, ctx: AgentContext) {
        self.contexts.lock().expect("agent adapter contexts mutex poisoned").insert(session_id.to_string(), ctx);
    }
}

#[async_trait]
impl EventHandler for AgentAdapter {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let request = match &event.payload {
            EventPayload::AgentDispatchRequest(r) => r.clone(),
            _ => return Ok(()),
        };
        let AgentDispatchRequest { user_id, query, agent: agent_name } = request;
        let correlation_id = event.correlation_id;

        let Some(agent) = self.agents.get(&agent_name) else {
            warn!(agent_name, "agent_dispatch_request named an unconfigured agent");
            return Ok(());
        };
        let Some(config) = self.agent_configs.get(&agent_name) else {
            warn!(agent_name, "agent has no matching config entry");
            return Ok(());
        };

        let resume_session_id = event.session.as_ref().filter(|s| s.action == SessionAction::Resume).map(|s| s.session_id.clone());

        let session = if let Some(session_id) = resume_session_id {
            match self.sessions.resume(&session_id, &query) {
                Ok(session) => session,
                Err(err) => {
                    warn!(error = %err, session_id, "failed to resume session, creating a new one instead");
                    match self.sessions.create(&agent_name, &user_id, config.priority, config.interruptible) {
                        Some(session) => session,
                        None => {
                            warn!(agent_name, user_id, "session creation refused, an existing session has priority");
                            return Ok(());
                        }
                    }
                }
            }
        } else {
            match self.sessions.create(&agent_name, &user_id, config.priority, config.interruptible) {
                Some(session) => session,
                None => {
                    warn!(agent_name, user_id, "session creation refused, an existing session has priority");
                    return Ok(());
                }
            }
        };

        self.active_sessions.set(&user_id, &session.session_id, &agent_name);

        let mut ctx = self.take_context(&session.session_id, &user_id);
        let mut response = self.runtime.run(agent, &query, &mut ctx).await;
        response.session_id = Some(session.session_id.clone());

        if let Some(id) = correlation_id {
            self.tracker.add_trace(id, "agent", query.clone(), response.message.clone());
        }
        self.stats.lock().expect("agent adapter stats mutex poisoned").record(0.0, matches!(response.status, AgentResponseStatus::Error));

        match response.status {
            AgentResponseStatus::WaitingInput => {
                let prompt = response.prompt.clone().unwrap_or_default();
                if let Err(err) = self.sessions.wait_for_input(&session.session_id, &prompt, None) {
                    warn!(error = %err, "wait_for_input failed after a waiting_input agent response");
                }
                self.store_context(&session.session_id, ctx);
                if let Some(id) = correlation_id {
                    self.tracker.set_status(id, TraceStatus::WaitingInput);
                }
            }
            AgentResponseStatus::Success | AgentResponseStatus::Completed | AgentResponseStatus::Error => {
                match self.sessions.complete(&session.session_id) {
                    Ok(outcome) => match outcome.resumed {
                        Some(resumed) => self.active_sessions.set(&user_id, &resumed.session_id, &resumed.agent_name),
                        None => self.active_sessions.clear(&user_id),
                    },
                    Err(SessionError::NotActive) => {
                        // Single-shot `Success` agents (e.g. SimpleAgent) never went through
                        // `wait_for_input`/`resume`, so this session may already be the active
                        // one without needing an explicit complete; nothing further to do.
                        self.active_sessions.clear(&user_id);
                    }
                    Err(err) => warn!(error = %err, "failed to complete session"),
                }

                if let Some(id) = correlation_id {
                    self.tracker.update_response(id, response.message.clone());
                    self.tracker.set_status(id, if matches!(response.status, AgentResponseStatus::Error) { TraceStatus::Failed } else { TraceStatus::Completed });
                }

                let success = !matches!(response.status, AgentResponseStatus::Error);
                if let Err(err) = self.memory.append(&user_id, &query, &response.message, &agent_name, success, Utc::now().timestamp_millis()).await {
                    warn!(error = %err, "failed to append short-term memory");
                }
            }
        }

        let mut response_event = Event::new(EventKind::AgentResponse, "agent", EventPayload::AgentResponse(response.clone()));
        if let Some(id) = correlation_id {
            response_event = response_event.with_correlation(id);
        }
        response_event = response_event.with_session(SessionAware {
            session_id: session.session_id.clone(),
            action: if matches!(response.status, AgentResponseStatus::WaitingInput) { SessionAction::New } else { SessionAction::Complete },
        });
        self.bus.publish(response_event).await;

        let tts_event = Event::new(EventKind::TtsSpeakRequest, "agent", EventPayload::TtsSpeakRequest(TtsSpeakRequest { text: response.message }));
        let tts_event = if let Some(id) = correlation_id { tts_event.with_correlation(id) } else { tts_event };
        self.bus.publish(tts_event).await;

        Ok(())
    }
}

#[async_trait]
impl Adapter for AgentAdapter {
    fn name(&self) -> &str {
        "agent"
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
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
        self.stats.lock().expect("agent adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_model::{MockEmbeddingProvider, ScriptedMockProvider};
    use vesper_runtime::SimpleAgent;

    fn config(name: &str) -> AgentConfig {
        AgentConfig { name: name.into(), description: String::new(), priority: 50, interruptible: true, enabled: true, capabilities: vec![] }
    }

    fn dispatch_event(user_id: &str, query: &str, agent: &str) -> Event {
        Event::new(EventKind::AgentDispatchRequest, "orchestrator", EventPayload::AgentDispatchRequest(AgentDispatchRequest { user_id: user_id.into(), query: query.into(), agent: agent.into() }))
    }

    fn memory_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(
            Default::default(),
            std::env::temp_dir().join(format!("vesper-adapters-test-{}", uuid::Uuid::new_v4())),
            vesper_memory::VectorStore::open_in_memory().unwrap(),
            Arc::new(MockEmbeddingProvider::new(8)),
            Arc::new(ScriptedMockProvider::always_text("{}")),
        ))
    }

    #[tokio::test]
    async fn simple_agent_completes_session_and_requests_tts() {
        let bus = Arc::new(EventBus::new());
        let mut agents = HashMap::new();
        agents.insert(
            "chat_agent".to_string(),
            Agent::Simple(SimpleAgent::new(vesper_runtime::AgentProfile::from(&config("chat_agent")), Arc::new(ScriptedMockProvider::always_text("hello there")), "sys")),
        );
        let sessions = Arc::new(SessionManager::new(300));
        let adapter = AgentAdapter::new(
            agents,
            vec![config("chat_agent")],
            Arc::new(AgentRuntime::new()),
            sessions,
            Arc::new(ActiveSessionIndex::new()),
            bus.clone(),
            Arc::new(MessageTracker::new()),
            memory_store(),
        );

        struct Capture(Arc<Mutex<Vec<TtsSpeakRequest>>>);
        #[async_trait]
        impl EventHandler for Capture {
            async fn handle(&self, event: Event) -> anyhow::Result<()> {
                if let EventPayload::TtsSpeakRequest(r) = event.payload {
                    self.0.lock().unwrap().push(r);
                }
                Ok(())
            }
        }
        let spoken = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe(EventKind::TtsSpeakRequest, Arc::new(Capture(spoken.clone())), vesper_core::Dispatch::Fast);

        adapter.handle(dispatch_event("u1", "hi", "chat_agent")).await.unwrap();
        assert_eq!(spoken.lock().unwrap().len(), 1);
        assert_eq!(spoken.lock().unwrap()[0].text, "hello there");
    }

    #[tokio::test]
    async fn unconfigured_agent_name_is_ignored() {
        let bus = Arc::new(EventBus::new());
        let adapter = AgentAdapter::new(HashMap::new(), vec![], Arc::new(AgentRuntime::new()), Arc::new(SessionManager::new(300)), Arc::new(ActiveSessionIndex::new()), bus, Arc::new(MessageTracker::new()), memory_store());
        assert!(adapter.handle(dispatch_event("u1", "hi", "ghost_agent")).await.is_ok());
    }
}

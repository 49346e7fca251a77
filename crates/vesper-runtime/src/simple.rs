// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use vesper_core::{AgentResponse, AgentResponseStatus};
use vesper_model::{CompletionRequest, Message, ModelProvider};

use crate::profile::{AgentContext, AgentProfile};

/// `handle(query, ctx) -> AgentResponse`, synchronous, single turn. No
/// tools, no multi-turn state; a direct model call stands in for
/// `chat_agent`-style free-form conversation.
pub struct SimpleAgent {
    pub profile: AgentProfile,
    pub model: Arc<dyn ModelProvider>,
    pub system_prompt: String,
}

impl SimpleAgent {
    pub fn new(profile: AgentProfile, model: Arc<dyn ModelProvider>, system_prompt: impl Into<String>) -> Self {
        Self { profile, model, system_prompt: system_prompt.into() }
    }

    pub async fn handle(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let mut messages = vec![Message::system(self.system_prompt.clone())];
        messages.extend(ctx.history.iter().cloned());
        messages.push(Message::user(query.to_string()));

        match self.model.complete(CompletionRequest { messages, ..Default::default() }).await {
            Ok(response) => AgentResponse { agent: self.profile.name.clone(), query: query.to_string(), status: AgentResponseStatus::Success, message: response.text, prompt: None, data: None, session_id: None },
            Err(err) => AgentResponse { agent: self.profile.name.clone(), query: query.to_string(), status: AgentResponseStatus::Error, message: format!("model call failed: {err}"), prompt: None, data: None, session_id: None },
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_config::AgentConfig;
    use vesper_model::ScriptedMockProvider;

    fn profile() -> AgentProfile {
        AgentProfile::from(&AgentConfig { name: "chat_agent".into(), description: String::new(), priority: 10, interruptible: true, enabled: true, capabilities: vec![] })
    }

    #[tokio::test]
    async fn handle_returns_success_with_model_text() {
        let agent = SimpleAgent::new(profile(), Arc::new(ScriptedMockProvider::always_text("hello there")), "You are a friendly assistant.");
        let resp = agent.handle("hi", &AgentContext::new("u1")).await;
        assert_eq!(resp.status, AgentResponseStatus::Success);
        assert_eq!(resp.message, "hello there");
        assert!(resp.session_id.is_none(), "the agent never touches session_id");
    }
}

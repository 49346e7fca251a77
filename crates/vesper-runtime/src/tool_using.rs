// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use tracing::warn;
use vesper_core::{AgentResponse, AgentResponseStatus};
use vesper_model::{CompletionRequest, Message, ModelProvider, ToolSchema};
use vesper_tools::{ToolRegistry, VehicleState};

use crate::heuristics::{looks_like_a_question, parse_structured_action, StructuredAction};
use crate::profile::{AgentContext, AgentProfile};

/// Caps the number of tool-call round trips per turn, guarding against a
/// model that never stops requesting tools.
const MAX_TOOL_ROUNDS: usize = 3;

/// System prompt + tool schemas → LLM with function calling → zero or more
/// tool invocations via the tool registry → LLM reply. Plain text
/// classified as a question is returned as `waiting_input` instead of
/// `success`, giving single- and multi-turn behavior from one code path.
pub struct ToolUsingAgent {
    pub profile: AgentProfile,
    pub model: Arc<dyn ModelProvider>,
    pub tools: Arc<ToolRegistry>,
    pub state: Arc<VehicleState>,
    pub system_prompt: String,
}

impl ToolUsingAgent {
    pub fn new(profile: AgentProfile, model: Arc<dyn ModelProvider>, tools: Arc<ToolRegistry>, state: Arc<VehicleState>, system_prompt: impl Into<String>) -> Self {
        Self { profile, model, tools, state, system_prompt: system_prompt.into() }
    }

    fn tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools.descriptors().into_iter().map(|d| ToolSchema { name: d.name, description: d.description, parameters: d.parameters }).collect()
    }

    pub async fn handle(&self, query: &str, ctx: &AgentContext) -> AgentResponse {
        let mut messages = vec![Message::system(self.system_prompt.clone())];
        messages.extend(ctx.history.iter().cloned());
        messages.push(Message::user(query.to_string()));

        let tool_schemas = self.tool_schemas();

        for _ in 0..MAX_TOOL_ROUNDS {
            let request = CompletionRequest { messages: messages.clone(), tools: tool_schemas.clone(), want_json: false };
            let response = match self.model.complete(request).await {
                Ok(response) => response,
                Err(err) => return self.error_response(query, format!("model call failed: {err}")),
            };

            if response.tool_calls.is_empty() {
                return self.finalize(query, &response.text, None);
            }

            messages.push(Message::assistant(response.text.clone()));
            for call in &response.tool_calls {
                let args: serde_json::Value = serde_json::from_str(&call.arguments).unwrap_or(serde_json::Value::Null);
                let output = self.tools.execute(&call.name, &args, &self.state).await;
                let rendered = match output {
                    Ok(out) => serde_json::to_string(&out).unwrap_or_else(|_| "{}".into()),
                    Err(err) => {
                        warn!(tool = %call.name, error = %err, "tool call rejected");
                        format!("{{\"success\":false,\"message\":{:?}}}", err.to_string())
                    }
                };
                messages.push(Message::tool(format!("{}: {}", call.name, rendered)));
            }
        }

        self.error_response(query, "exceeded maximum tool-call rounds without a final reply")
    }

    fn finalize(&self, query: &str, text: &str, data: Option<serde_json::Value>) -> AgentResponse {
        let structured = serde_json::from_str::<serde_json::Value>(text).ok().and_then(|v| parse_structured_action(&v).map(|a| (a, v)));

        let (status, prompt, message) = if let Some((StructuredAction::AskUser, value)) = &structured {
            let prompt = value.get("prompt").and_then(serde_json::Value::as_str).unwrap_or(text).to_string();
            (AgentResponseStatus::WaitingInput, Some(prompt.clone()), prompt)
        } else if looks_like_a_question(text) {
            (AgentResponseStatus::WaitingInput, Some(text.to_string()), text.to_string())
        } else {
            (AgentResponseStatus::Success, None, text.to_string())
        };

        AgentResponse { agent: self.profile.name.clone(), query: query.to_string(), status, message, prompt, data, session_id: None }
    }

    fn error_response(&self, query: &str, message: impl Into<String>) -> AgentResponse {
        AgentResponse { agent: self.profile.name.clone(), query: query.to_string(), status: AgentResponseStatus::Error, message: message.into(), prompt: None, data: None, session_id: None }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use vesper_config::AgentConfig;
    use vesper_model::{CompletionResponse, ScriptedMockProvider, ToolCallRequest, Usage};
    use vesper_tools::{ParamSpec, ParamType, Tool, ToolOutput};

    fn profile() -> AgentProfile {
        AgentProfile::from(&AgentConfig { name: "music_agent".into(), description: String::new(), priority: 50, interruptible: true, enabled: true, capabilities: vec!["music".into()] })
    }

    struct PlayMusicStub;

    #[async_trait]
    impl Tool for PlayMusicStub {
        fn name(&self) -> &str {
            "play_music"
        }
        fn description(&self) -> &str {
            "plays a song"
        }
        fn category(&self) -> &str {
            "media"
        }
        fn parameters(&self) -> &[ParamSpec] {
            use std::sync::OnceLock;
            static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
            SCHEMA.get_or_init(|| vec![ParamSpec::required("song", ParamType::String)])
        }
        async fn execute(&self, args: &serde_json::Value, _state: &VehicleState) -> ToolOutput {
            ToolOutput::ok_with_data("now playing", args.clone())
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut reg = ToolRegistry::new();
        reg.register(PlayMusicStub);
        Arc::new(reg)
    }

    #[tokio::test]
    async fn plain_text_reply_without_question_is_success() {
        let agent = ToolUsingAgent::new(profile(), Arc::new(ScriptedMockProvider::always_text("playing your jazz playlist now")), registry(), Arc::new(VehicleState::new()), "sys");
        let resp = agent.handle("play jazz", &AgentContext::new("u1")).await;
        assert_eq!(resp.status, AgentResponseStatus::Success);
    }

    #[tokio::test]
    async fn plain_text_reply_with_question_is_waiting_input() {
        let agent = ToolUsingAgent::new(profile(), Arc::new(ScriptedMockProvider::always_text("好的,请问想听什么歌?")), registry(), Arc::new(VehicleState::new()), "sys");
        let resp = agent.handle("播放音乐", &AgentContext::new("u1")).await;
        assert_eq!(resp.status, AgentResponseStatus::WaitingInput);
        assert!(resp.prompt.is_some());
    }

    #[tokio::test]
    async fn tool_call_is_executed_then_final_reply_is_returned() {
        let provider = ScriptedMockProvider::new(vec![
            CompletionResponse { text: String::new(), tool_calls: vec![ToolCallRequest { id: "1".into(), name: "play_music".into(), arguments: json!({ "song": "晴天" }).to_string() }], usage: Usage::default() },
            CompletionResponse { text: "done, playing 晴天".into(), tool_calls: vec![], usage: Usage::default() },
        ]);
        let agent = ToolUsingAgent::new(profile(), Arc::new(provider), registry(), Arc::new(VehicleState::new()), "sys");
        let resp = agent.handle("play 晴天", &AgentContext::new("u1")).await;
        assert_eq!(resp.status, AgentResponseStatus::Success);
        assert_eq!(resp.message, "done, playing 晴天");
    }

    #[tokio::test]
    async fn structured_ask_user_action_is_preferred_over_heuristic() {
        let agent = ToolUsingAgent::new(
            profile(),
            Arc::new(ScriptedMockProvider::always_text(r#"{"action":"ask_user","prompt":"pick an artist"}"#)),
            registry(),
            Arc::new(VehicleState::new()),
            "sys",
        );
        let resp = agent.handle("play something", &AgentContext::new("u1")).await;
        assert_eq!(resp.status, AgentResponseStatus::WaitingInput);
        assert_eq!(resp.prompt.as_deref(), Some("pick an artist"));
    }
}

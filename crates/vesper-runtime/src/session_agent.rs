// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use vesper_core::{AgentResponse, AgentResponseStatus};
use vesper_model::{CompletionRequest, Message, ModelProvider};
use vesper_tools::{ToolRegistry, VehicleState};

use crate::profile::{AgentContext, AgentProfile};

/// `process(query, ctx) -> AgentResponse`, where `ctx` may carry prior
/// session state and the result is either `waiting_input` or terminal; the
/// agent never touches `session_id` itself. Modeled as slot-filling: a
/// fixed set of named slots is extracted from the running conversation
/// turn by turn; once every slot is filled the bound tool is invoked and
/// the session completes.
pub struct SessionAgent {
    pub profile: AgentProfile,
    pub model: Arc<dyn ModelProvider>,
    pub tools: Arc<ToolRegistry>,
    pub state: Arc<VehicleState>,
    pub required_slots: Vec<String>,
    pub tool_name: String,
}

impl SessionAgent {
    pub fn new(profile: AgentProfile, model: Arc<dyn ModelProvider>, tools: Arc<ToolRegistry>, state: Arc<VehicleState>, required_slots: Vec<String>, tool_name: impl Into<String>) -> Self {
        Self { profile, model, tools, state, required_slots, tool_name: tool_name.into() }
    }

    pub async fn process(&self, query: &str, ctx: &mut AgentContext) -> AgentResponse {
        let prompt = format!(
            "Required fields: {}.\nAlready known: {}.\nThe user just said: \"{query}\".\n\
             Extract any of the required fields mentioned. Respond with JSON: \
             {{\"slots\": {{field: value, ...}}}}.",
            self.required_slots.join(", "),
            serde_json::to_string(&ctx.slots).unwrap_or_else(|_| "{}".into()),
        );
        let request = CompletionRequest { messages: vec![Message::system("You extract structured booking details from conversation."), Message::user(prompt)], want_json: true, ..Default::default() };

        match self.model.complete(request).await {
            Ok(response) => {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(&response.text) {
                    if let Some(slots) = value.get("slots").and_then(serde_json::Value::as_object) {
                        for (k, v) in slots {
                            if self.required_slots.contains(k) {
                                ctx.slots.insert(k.clone(), v.clone());
                            }
                        }
                    }
                }
            }
            Err(err) => return self.error_response(query, format!("model call failed: {err}")),
        }

        match self.required_slots.iter().find(|slot| !ctx.slots.contains_key(*slot)) {
            Some(missing) => {
                let prompt = format!("What's the {missing}?");
                AgentResponse { agent: self.profile.name.clone(), query: query.to_string(), status: AgentResponseStatus::WaitingInput, message: prompt.clone(), prompt: Some(prompt), data: None, session_id: None }
            }
            None => {
                let args = serde_json::Value::Object(ctx.slots.clone().into_iter().collect());
                match self.tools.execute(&self.tool_name, &args, &self.state).await {
                    Ok(output) => AgentResponse {
                        agent: self.profile.name.clone(),
                        query: query.to_string(),
                        status: if output.success { AgentResponseStatus::Completed } else { AgentResponseStatus::Error },
                        message: output.message,
                        prompt: None,
                        data: output.data,
                        session_id: None,
                    },
                    Err(err) => self.error_response(query, err.to_string()),
                }
            }
        }
    }

    fn error_response(&self, query: &str, message: impl Into<String>) -> AgentResponse {
        AgentResponse { agent: self.profile.name.clone(), query: query.to_string(), status: AgentResponseStatus::Error, message: message.into(), prompt: None, data: None, session_id: None }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

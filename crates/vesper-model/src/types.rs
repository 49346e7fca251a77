// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One turn in a completion request. Tool-call/tool-result turns are
/// represented as plain text for the orchestrator's and runtime's own
/// bookkeeping; the wire encoding of an actual tool round-trip is the
/// provider's concern (`openai_compat` folds it into the standard
/// `tool_calls` / `tool` message fields).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self { role: Role::System, content: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: text.into() }
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self { role: Role::Tool, content: text.into() }
    }
}

/// A tool schema offered to the model, JSON-Schema parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Request sent to a [`crate::ModelProvider`].
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSchema>,
    /// Caller-suggested structured response shape; providers that support
    /// JSON mode pass this through, others ignore it and rely on the
    /// text-heuristic fallback in `vesper-runtime`.
    pub want_json: bool,
}

/// A tool call requested by the model inside a [`CompletionResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object.
    pub arguments: String,
}

#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Result of one non-streaming completion call.
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub usage: Usage,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::system("a").role, Role::System);
        assert_eq!(Message::user("a").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
        assert_eq!(Message::tool("a").role, Role::Tool);
    }

    #[test]
    fn completion_request_defaults_to_no_tools_and_no_json() {
        let req = CompletionRequest::default();
        assert!(req.tools.is_empty());
        assert!(!req.want_json);
    }
}

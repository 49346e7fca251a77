// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::state::VehicleState;
use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};

/// Sends a short text message (category `comms`). The `chat_agent` fallback
/// agent's one tool, used when no more specific agent claims an utterance.
pub struct SendMessage;

#[async_trait]
impl Tool for SendMessage {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a short text message to a named recipient"
    }

    fn category(&self) -> &str {
        "comms"
    }

    fn parameters(&self) -> &[ParamSpec] {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            vec![
                ParamSpec::required("recipient", ParamType::String),
                ParamSpec::required("text", ParamType::String),
            ]
        })
    }

    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput {
        let recipient = args["recipient"].as_str().unwrap_or_default().to_string();
        let text = args["text"].as_str().unwrap_or_default().to_string();
        state.set("last_message_sent", json!({ "recipient": recipient, "text": text }));
        ToolOutput::ok(format!("message sent to {recipient}"))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_last_message_sent() {
        let state = VehicleState::new();
        let out = SendMessage.execute(&json!({ "recipient": "mom", "text": "running late" }), &state).await;
        assert!(out.success);
        assert_eq!(state.get("last_message_sent").unwrap()["recipient"], json!("mom"));
    }
}

// SPDX-License-Identifier: Apache-2.0
//! Non-streaming client for OpenAI-compatible `/chat/completions` and
//! `/embeddings` endpoints. One client covers every provider that speaks
//! this wire format (OpenAI itself, Groq, Ollama, vLLM, llama.cpp servers).
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{CompletionRequest, CompletionResponse, EmbeddingProvider, Message, ModelProvider, Role, ToolCallRequest, Usage};

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn to_wire_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| json!({ "role": role_str(m.role), "content": m.content }))
        .collect()
}

/// OpenAI-compatible completion + embedding provider.
pub struct OpenAiCompatProvider {
    model: String,
    api_key: Option<String>,
    chat_url: String,
    embeddings_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// `base_url` ends before `/chat/completions`, e.g. `https://api.openai.com/v1`.
    pub fn new(model: impl Into<String>, api_key: Option<String>, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            model: model.into(),
            api_key,
            chat_url: format!("{base}/chat/completions"),
            embeddings_url: format!("{base}/embeddings"),
            client: reqwest::Client::new(),
        }
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let mut body = json!({
            "model": self.model,
            "messages": to_wire_messages(&req.messages),
        });
        if !req.tools.is_empty() {
            let tools: Vec<Value> = req
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        if req.want_json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let response = self
            .auth(self.client.post(&self.chat_url).json(&body))
            .send()
            .await
            .context("sending chat completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("chat completion request failed ({status}): {text}");
        }

        let value: Value = response.json().await.context("decoding chat completion response")?;
        let choice = value["choices"].get(0).context("response had no choices")?;
        let message = &choice["message"];

        let text = message["content"].as_str().unwrap_or_default().to_string();
        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|c| {
                        Some(ToolCallRequest {
                            id: c["id"].as_str()?.to_string(),
                            name: c["function"]["name"].as_str()?.to_string(),
                            arguments: c["function"]["arguments"].as_str().unwrap_or("{}").to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = Usage {
            input_tokens: value["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: value["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(CompletionResponse { text, tool_calls, usage })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn dimensions(&self) -> usize {
        1536
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let body = json!({ "model": self.model, "input": text });
        let response = self
            .auth(self.client.post(&self.embeddings_url).json(&body))
            .send()
            .await
            .context("sending embedding request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            bail!("embedding request failed ({status}): {text}");
        }

        let value: Value = response.json().await.context("decoding embedding response")?;
        let embedding = value["data"][0]["embedding"]
            .as_array()
            .context("embedding response had no data[0].embedding")?
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        Ok(embedding)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

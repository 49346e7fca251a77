// SPDX-License-Identifier: Apache-2.0
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResponse, EmbeddingProvider, ModelProvider};

/// Deterministic mock completion provider for tests and `model.provider =
/// "mock"` deployments, keeping the system usable without a configured LLM.
/// Echoes the last user message.
#[derive(Default)]
pub struct MockProvider;

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "rule-based"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        let last_user = req
            .messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("");
        Ok(CompletionResponse {
            text: format!("MOCK: {last_user}"),
            tool_calls: Vec::new(),
            usage: crate::Usage { input_tokens: last_user.len() as u32 / 4, output_tokens: 4 },
        })
    }
}

/// A pre-scripted mock provider. Each call to `complete` pops the next
/// queued response, falling back to an empty reply once exhausted. Lets
/// tests drive the orchestrator/runtime through exact decision sequences
/// without network access.
pub struct ScriptedMockProvider {
    scripts: Mutex<Vec<CompletionResponse>>,
    pub last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedMockProvider {
    pub fn new(scripts: Vec<CompletionResponse>) -> Self {
        Self { scripts: Mutex::new(scripts), last_request: Mutex::new(None) }
    }

    pub fn always_text(reply: impl Into<String>) -> Self {
        Self::new(vec![CompletionResponse { text: reply.into(), ..Default::default() }])
    }
}

#[async_trait]
impl ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }

    fn model_name(&self) -> &str {
        "scripted-mock-model"
    }

    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse> {
        *self.last_request.lock().expect("scripted mock mutex poisoned") = Some(req);
        let mut scripts = self.scripts.lock().expect("scripted mock mutex poisoned");
        if scripts.is_empty() {
            Ok(CompletionResponse { text: "[no more scripts]".into(), ..Default::default() })
        } else {
            Ok(scripts.remove(0))
        }
    }
}

/// Deterministic pseudo-embedding for tests and `model.provider = "mock"`
/// deployments. Hashes the input text into a fixed-size `f32` vector; not
/// semantically meaningful, but stable and collision-resistant enough to
/// exercise cosine-similarity recall end-to-end without a real model.
pub struct MockEmbeddingProvider {
    dims: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(32)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vector = Vec::with_capacity(self.dims);
        for i in 0..self.dims {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            vector.push(((bits % 2000) as f32 - 1000.0) / 1000.0);
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

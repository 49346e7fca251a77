// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::CompletionRequest;
use crate::CompletionResponse;

/// Text completion driver used by the orchestrator and agent runtime for
/// decision-making and tool-call planning.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model_name(&self) -> &str;
    async fn complete(&self, req: CompletionRequest) -> anyhow::Result<CompletionResponse>;
}

/// Embedding driver used by the memory subsystem (C9) for long-term recall.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

// SPDX-License-Identifier: Apache-2.0
mod mock;
mod openai_compat;
mod provider;
mod types;

pub use mock::{MockEmbeddingProvider, MockProvider, ScriptedMockProvider};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{EmbeddingProvider, ModelProvider};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, ToolCallRequest, ToolSchema, Usage};

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use vesper_config::ModelConfig;

/// Construct a boxed [`ModelProvider`] from configuration, selecting the
/// driver by `cfg.provider`. Falls back to the deterministic mock when
/// `cfg.provider == "mock"` so the system stays usable without a configured
/// LLM.
pub fn provider_from_config(cfg: &ModelConfig) -> anyhow::Result<Arc<dyn ModelProvider>> {
    match cfg.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider)),
        "openai-compat" | "openai" => {
            let base_url = cfg.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
            let api_key = resolve_api_key(cfg)?;
            Ok(Arc::new(OpenAiCompatProvider::new(cfg.name.clone(), api_key, base_url)))
        }
        other => bail!("unknown model provider: {other}"),
    }
}

/// Construct a boxed [`EmbeddingProvider`] from configuration.
pub fn embedding_provider_from_config(cfg: &ModelConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match cfg.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbeddingProvider::default())),
        "openai-compat" | "openai" => {
            let base_url = cfg.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
            let api_key = resolve_api_key(cfg)?;
            Ok(Arc::new(OpenAiCompatProvider::new(cfg.name.clone(), api_key, base_url)))
        }
        other => bail!("unknown embedding provider: {other}"),
    }
}

fn resolve_api_key(cfg: &ModelConfig) -> anyhow::Result<Option<String>> {
    match &cfg.api_key_env {
        None => Ok(None),
        Some(var) => env::var(var).map(Some).with_context(|| format!("reading API key from ${var}")),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_provider_is_selected_by_default_config() {
        let cfg = ModelConfig::default();
        let provider = provider_from_config(&cfg).unwrap();
        assert_eq!(provider.name(), "mock");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cfg = ModelConfig { provider: "carrier-pigeon".into(), ..ModelConfig::default() };
        assert!(provider_from_config(&cfg).is_err());
    }

    #[test]
    fn missing_api_key_env_var_is_an_error() {
        let cfg = ModelConfig {
            provider: "openai-compat".into(),
            api_key_env: Some("VESPER_TEST_NONEXISTENT_KEY_VAR".into()),
            ..ModelConfig::default()
        };
        assert!(provider_from_config(&cfg).is_err());
    }
}

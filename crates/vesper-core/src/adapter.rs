// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds shared by every module that can fail at startup or during
/// event handling.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("speech recognition failed: {0}")]
    RecognitionFailed(String),
    #[error("LLM call failed: {0}")]
    LlmCallFailed(String),
    #[error("tool execution failed: {0}")]
    ToolExecutionFailed(String),
    #[error("session conflict")]
    SessionConflict,
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

/// Rolling counters returned by `Adapter::statistics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterStats {
    pub events_processed: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
}

impl AdapterStats {
    /// Fold one more observation into the running average latency.
    pub fn record(&mut self, latency_ms: f64, is_error: bool) {
        self.events_processed += 1;
        if is_error {
            self.errors += 1;
        }
        let n = self.events_processed as f64;
        self.avg_latency_ms += (latency_ms - self.avg_latency_ms) / n;
    }
}

/// Uniform lifecycle contract shared by module adapters and owned by the
/// controller.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;
    async fn initialize(&self) -> Result<(), AdapterError>;
    async fn start(&self) -> Result<(), AdapterError>;
    async fn stop(&self) -> Result<(), AdapterError>;
    async fn cleanup(&self) -> Result<(), AdapterError>;
    fn statistics(&self) -> AdapterStats {
        AdapterStats::default()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

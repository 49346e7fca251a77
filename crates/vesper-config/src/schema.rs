// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Top-level merged configuration: one agent roster plus the pipeline knobs.
///
/// An ordered list of agent configs, and a pipeline config with `audio`,
/// `vad`, and `memory` sub-blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

/// Per-agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 0–100, higher preempts lower per the session manager's preemption rule.
    pub priority: u8,
    pub interruptible: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl AgentConfig {
    /// The orchestrator falls back to `chat_agent` when nothing else
    /// matches.
    pub fn fallback_name() -> &'static str {
        "chat_agent"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            vad: VadConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u8,
    pub chunk_size: usize,
    pub format: String,
    pub buffer_seconds: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
            chunk_size: 1024,
            format: "pcm_s16le".into(),
            buffer_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadConfig {
    /// One of 10, 20, 30 (the only frame durations the bundled VAD accepts).
    pub frame_duration_ms: u32,
    /// 0..=3.
    pub aggressiveness: u8,
    pub silence_timeout_ms: u32,
    pub pre_speech_buffer_ms: u32,
    pub min_speech_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: 30,
            aggressiveness: 2,
            silence_timeout_ms: 800,
            pre_speech_buffer_ms: 300,
            min_speech_duration_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub trigger_count: usize,
    pub max_history_rounds: usize,
    pub embedding_model: String,
    pub vector_db_path: String,
    pub long_term_file: String,
    /// Bounds the short-term ring buffer rather than leaving it unbounded.
    #[serde(default = "default_short_term_capacity")]
    pub short_term_capacity: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

fn default_short_term_capacity() -> usize {
    50
}

fn default_similarity_threshold() -> f32 {
    0.7
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            trigger_count: 10,
            max_history_rounds: 20,
            embedding_model: "text-embedding-3-small".into(),
            vector_db_path: "vesper_memory.sqlite3".into(),
            long_term_file: "long_term_memory.json".into(),
            short_term_capacity: default_short_term_capacity(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// Session manager knobs for the TTL sweeper: interval and timeout
/// configurable rather than hard-coded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub ttl_sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: 300,
            ttl_sweep_interval_secs: 30,
        }
    }
}

/// LLM client configuration shared by the orchestrator, agent runtime, and
/// memory summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub name: String,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub driver_options: serde_json::Value,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "mock".into(),
            name: "rule-based".into(),
            api_key_env: None,
            base_url: None,
            driver_options: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    pub server_name: String,
    pub version: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            server_name: "vesper".into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Free-form capability → keyword map used by the orchestrator's rule-based
/// fallback. Kept separate from `AgentConfig.capabilities` so callers can
/// build it from any source (config file, static list).
pub type CapabilityIndex = HashMap<String, Vec<String>>;

// ─── Unit tests ──────────────────────────────────────────────────────────────

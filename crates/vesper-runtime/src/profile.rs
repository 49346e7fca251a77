// SPDX-License-Identifier: Apache-2.0
use vesper_config::AgentConfig;

/// `{name, description, capabilities, priority, interruptible}`, declared at
/// construction from configuration.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub description: String,
    pub capabilities: Vec<String>,
    pub priority: u8,
    pub interruptible: bool,
}

impl From<&AgentConfig> for AgentProfile {
    fn from(cfg: &AgentConfig) -> Self {
        Self { name: cfg.name.clone(), description: cfg.description.clone(), capabilities: cfg.capabilities.clone(), priority: cfg.priority, interruptible: cfg.interruptible }
    }
}

/// Conversational turn history and per-session key-value context threaded
/// through multi-turn agents, carrying prior session state between turns.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub user_id: String,
    pub history: Vec<vesper_model::Message>,
    pub slots: std::collections::HashMap<String, serde_json::Value>,
}

impl AgentContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), history: Vec::new(), slots: std::collections::HashMap::new() }
    }
}

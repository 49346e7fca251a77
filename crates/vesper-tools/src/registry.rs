// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::state::VehicleState;
use crate::tool::{validate_args, Tool, ToolError, ToolOutput};

/// A tool schema for presentation to an LLM or over MCP — mirrors
/// `vesper_model::ToolSchema` but keeps this crate independent of the model
/// crate.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub category: String,
    pub parameters: serde_json::Value,
}

/// Registry indexed by name with a secondary index by category.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    by_category: HashMap<String, Vec<String>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new(), by_category: HashMap::new() }
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        let category = tool.category().to_string();
        self.tools.insert(name.clone(), Arc::new(tool));
        let bucket = self.by_category.entry(category).or_default();
        if !bucket.contains(&name) {
            bucket.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn names_in_category(&self, category: &str) -> Vec<String> {
        self.by_category.get(category).cloned().unwrap_or_default()
    }

    fn descriptor_for(&self, tool: &Arc<dyn Tool>) -> ToolDescriptor {
        let params = tool
            .parameters()
            .iter()
            .map(|p| {
                serde_json::json!({
                    "name": p.name,
                    "type": p.param_type,
                    "required": p.required,
                    "default": p.default,
                    "enum": p.enum_values,
                })
            })
            .collect::<Vec<_>>();
        ToolDescriptor {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            category: tool.category().to_string(),
            parameters: Value::Array(params),
        }
    }

    /// Descriptors for every registered tool, sorted by name.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut names = self.names();
        names.sort();
        names.into_iter().filter_map(|n| self.tools.get(&n).map(|t| self.descriptor_for(t))).collect()
    }

    /// Validates `args` against the tool's declared schema, then dispatches
    /// the call.
    pub async fn execute(&self, name: &str, args: &Value, state: &VehicleState) -> Result<ToolOutput, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let filled = validate_args(tool.parameters(), args)?;
        Ok(tool.execute(&filled, state).await)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

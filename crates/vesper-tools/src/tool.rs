// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::state::VehicleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

/// One declared parameter: name, type, required, default, enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(rename = "enum", default)]
    pub enum_values: Option<Vec<Value>>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self { name: name.into(), param_type, required: true, default: None, enum_values: None }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType, default: Value) -> Self {
        Self { name: name.into(), param_type, required: false, default: Some(default), enum_values: None }
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    fn type_matches(&self, value: &Value) -> bool {
        match self.param_type {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("missing required parameter: {0}")]
    MissingParam(String),
    #[error("parameter {name} has wrong type, expected {expected:?}")]
    WrongType { name: String, expected: ParamType },
    #[error("parameter {name} is not one of the allowed values")]
    NotInEnum { name: String },
}

/// Validates `args` against `schema`: type, required, enum.
pub fn validate_args(schema: &[ParamSpec], args: &Value) -> Result<Value, ToolError> {
    let mut filled = if args.is_object() { args.clone() } else { Value::Object(Default::default()) };
    let map = filled.as_object_mut().expect("coerced to object above");

    for param in schema {
        match map.get(&param.name) {
            Some(value) => {
                if !param.type_matches(value) {
                    return Err(ToolError::WrongType { name: param.name.clone(), expected: param.param_type });
                }
                if let Some(allowed) = &param.enum_values {
                    if !allowed.contains(value) {
                        return Err(ToolError::NotInEnum { name: param.name.clone() });
                    }
                }
            }
            None => {
                if param.required {
                    return Err(ToolError::MissingParam(param.name.clone()));
                }
                if let Some(default) = &param.default {
                    map.insert(param.name.clone(), default.clone());
                }
            }
        }
    }
    Ok(filled)
}

/// Result of one tool execution: `{success, message, data?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolOutput {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), data: None }
    }

    pub fn ok_with_data(message: impl Into<String>, data: Value) -> Self {
        Self { success: true, message: message.into(), data: Some(data) }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), data: None }
    }
}

/// A named callable with a declared parameter schema, bound to a handler
/// that mutates vehicle state.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    fn parameters(&self) -> &[ParamSpec];
    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput;
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

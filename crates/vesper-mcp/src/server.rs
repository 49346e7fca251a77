// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;
use vesper_config::McpConfig;
use vesper_tools::{ToolRegistry, VehicleState};

use crate::protocol::{McpError, McpRequest, McpResponse};

/// Dispatches the tool-calling wire surface: `initialize`, `tools/list`,
/// `tools/call`, over a JSON request/response envelope with integer error
/// codes mirroring the JSON-RPC convention.
pub struct McpServer {
    config: McpConfig,
    registry: Arc<ToolRegistry>,
    state: Arc<VehicleState>,
}

impl McpServer {
    pub fn new(config: McpConfig, registry: Arc<ToolRegistry>, state: Arc<VehicleState>) -> Self {
        Self { config, registry, state }
    }

    pub async fn handle(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            "initialize" => self.initialize(request.id),
            "tools/list" => self.tools_list(request.id),
            "tools/call" => self.tools_call(request.id, &request.params).await,
            other => McpResponse::err(request.id, McpError::method_not_found(other)),
        }
    }

    fn initialize(&self, id: Value) -> McpResponse {
        McpResponse::ok(
            id,
            json!({
                "server_name": self.config.server_name,
                "version": self.config.version,
                "capabilities": { "tools": true },
            }),
        )
    }

    fn tools_list(&self, id: Value) -> McpResponse {
        let tools: Vec<Value> = self
            .registry
            .descriptors()
            .into_iter()
            .map(|d| json!({ "name": d.name, "description": d.description, "category": d.category, "parameters": d.parameters }))
            .collect();
        McpResponse::ok(id, json!({ "tools": tools }))
    }

    async fn tools_call(&self, id: Value, params: &Value) -> McpResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return McpResponse::err(id, McpError::invalid_params("missing required field: name"));
        };
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        match self.registry.execute(name, &arguments, &self.state).await {
            Ok(output) => match serde_json::to_value(&output) {
                Ok(value) => McpResponse::ok(id, value),
                Err(err) => {
                    warn!(error = %err, "failed to serialize tool output");
                    McpResponse::err(id, McpError::internal(err.to_string()))
                }
            },
            Err(err) => McpResponse::err(id, McpError::invalid_params(err.to_string())),
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_tools::builtin;

    fn make_server() -> McpServer {
        let mut registry = ToolRegistry::new();
        builtin::register_all(&mut registry);
        McpServer::new(McpConfig::default(), Arc::new(registry), Arc::new(VehicleState::new()))
    }

    fn req(method: &str, params: Value) -> McpRequest {
        McpRequest { id: json!(1), method: method.to_string(), params }
    }

    #[tokio::test]
    async fn initialize_returns_server_name() {
        let server = make_server();
        let resp = server.handle(req("initialize", Value::Null)).await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["server_name"], json!("vesper"));
    }

    #[tokio::test]
    async fn tools_list_includes_registered_tools() {
        let server = make_server();
        let resp = server.handle(req("tools/list", Value::Null)).await;
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 6);
    }

    #[tokio::test]
    async fn tools_call_executes_known_tool() {
        let server = make_server();
        let resp = server
            .handle(req("tools/call", json!({ "name": "navigate_to", "arguments": { "destination": "airport" } })))
            .await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["success"], json!(true));
    }

    #[tokio::test]
    async fn tools_call_missing_name_is_invalid_params() {
        let server = make_server();
        let resp = server.handle(req("tools/call", json!({}))).await;
        assert_eq!(resp.error.unwrap().code, crate::protocol::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tools_call_unknown_tool_is_invalid_params() {
        let server = make_server();
        let resp = server.handle(req("tools/call", json!({ "name": "teleport" }))).await;
        assert_eq!(resp.error.unwrap().code, crate::protocol::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let server = make_server();
        let resp = server.handle(req("shutdown", Value::Null)).await;
        assert_eq!(resp.error.unwrap().code, crate::protocol::METHOD_NOT_FOUND);
    }
}

// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::Value;

use crate::state::VehicleState;
use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};

/// Sets the navigation destination (category `navigation`).
pub struct NavigateTo;

#[async_trait]
impl Tool for NavigateTo {
    fn name(&self) -> &str {
        "navigate_to"
    }

    fn description(&self) -> &str {
        "Start turn-by-turn navigation to a destination"
    }

    fn category(&self) -> &str {
        "navigation"
    }

    fn parameters(&self) -> &[ParamSpec] {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
        SCHEMA.get_or_init(|| vec![ParamSpec::required("destination", ParamType::String)])
    }

    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput {
        let destination = args["destination"].as_str().unwrap_or_default().to_string();
        state.set("nav_destination", Value::String(destination.clone()));
        state.set("nav_active", Value::Bool(true));
        ToolOutput::ok(format!("navigating to {destination}"))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sets_destination_and_activates_nav() {
        let state = VehicleState::new();
        let out = NavigateTo.execute(&json!({ "destination": "airport" }), &state).await;
        assert!(out.success);
        assert_eq!(state.get("nav_destination"), Some(json!("airport")));
        assert_eq!(state.get("nav_active"), Some(json!(true)));
    }
}

// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::state::VehicleState;
use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};

/// Opens or closes one window (category `comfort`).
pub struct OpenWindow;

#[async_trait]
impl Tool for OpenWindow {
    fn name(&self) -> &str {
        "open_window"
    }

    fn description(&self) -> &str {
        "Open or close a named window"
    }

    fn category(&self) -> &str {
        "comfort"
    }

    fn parameters(&self) -> &[ParamSpec] {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            vec![
                ParamSpec::required("position", ParamType::String).with_enum(vec![
                    json!("driver"),
                    json!("passenger"),
                    json!("rear_left"),
                    json!("rear_right"),
                    json!("all"),
                ]),
                ParamSpec::optional("open", ParamType::Boolean, json!(true)),
            ]
        })
    }

    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput {
        let position = args["position"].as_str().unwrap_or("driver").to_string();
        let open = args["open"].as_bool().unwrap_or(true);

        let positions: Vec<&str> = if position == "all" {
            vec!["driver", "passenger", "rear_left", "rear_right"]
        } else {
            vec![position.as_str()]
        };
        for pos in &positions {
            state.set(format!("window_{pos}_open"), Value::Bool(open));
        }

        let verb = if open { "opened" } else { "closed" };
        ToolOutput::ok(format!("{verb} window: {position}"))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

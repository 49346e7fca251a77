// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::state::VehicleState;
use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};

/// Sets cabin temperature for a zone (category `climate`).
pub struct SetTemperature;

#[async_trait]
impl Tool for SetTemperature {
    fn name(&self) -> &str {
        "set_temperature"
    }

    fn description(&self) -> &str {
        "Set the target cabin temperature, in Celsius, for a climate zone"
    }

    fn category(&self) -> &str {
        "climate"
    }

    fn parameters(&self) -> &[ParamSpec] {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            vec![
                ParamSpec::required("celsius", ParamType::Number),
                ParamSpec::optional("zone", ParamType::String, json!("driver"))
                    .with_enum(vec![json!("driver"), json!("passenger"), json!("rear")]),
            ]
        })
    }

    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput {
        let celsius = args["celsius"].as_f64().unwrap_or(21.0);
        let zone = args["zone"].as_str().unwrap_or("driver").to_string();
        state.set(format!("temperature_celsius_{zone}"), json!(celsius));
        ToolOutput::ok(format!("set {zone} temperature to {celsius}°C"))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

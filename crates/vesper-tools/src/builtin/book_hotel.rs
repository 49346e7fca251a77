// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::state::VehicleState;
use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};

/// Books a hotel stay (category `travel`). Exists to exercise the
/// multi-turn `waiting_input` scenario: the agent that owns this tool asks
/// a follow-up before calling it when `nights` is missing from the query.
pub struct BookHotel;

#[async_trait]
impl Tool for BookHotel {
    fn name(&self) -> &str {
        "book_hotel"
    }

    fn description(&self) -> &str {
        "Book a hotel room in a city for a number of nights"
    }

    fn category(&self) -> &str {
        "travel"
    }

    fn parameters(&self) -> &[ParamSpec] {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            vec![
                ParamSpec::required("city", ParamType::String),
                ParamSpec::required("nights", ParamType::Number),
            ]
        })
    }

    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput {
        let city = args["city"].as_str().unwrap_or_default().to_string();
        let nights = args["nights"].as_f64().unwrap_or(1.0);
        let confirmation = format!("HTL-{city}-{nights}", city = city.to_uppercase(), nights = nights as u64);
        state.set("last_hotel_booking", json!({ "city": city, "nights": nights, "confirmation": confirmation }));
        ToolOutput::ok_with_data(
            format!("booked {nights} night(s) in {city}, confirmation {confirmation}"),
            json!({ "confirmation": confirmation }),
        )
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn books_and_records_confirmation() {
        let state = VehicleState::new();
        let out = BookHotel.execute(&json!({ "city": "paris", "nights": 2 }), &state).await;
        assert!(out.success);
        assert!(out.data.unwrap()["confirmation"].as_str().unwrap().starts_with("HTL-PARIS"));
        assert!(state.get("last_hotel_booking").is_some());
    }
}

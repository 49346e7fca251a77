// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::Value;

use crate::state::VehicleState;
use crate::tool::{ParamSpec, ParamType, Tool, ToolOutput};

/// Starts playback of a track, artist, or playlist query (category `media`).
pub struct PlayMusic;

#[async_trait]
impl Tool for PlayMusic {
    fn name(&self) -> &str {
        "play_music"
    }

    fn description(&self) -> &str {
        "Play a track, artist, or playlist by free-text query"
    }

    fn category(&self) -> &str {
        "media"
    }

    fn parameters(&self) -> &[ParamSpec] {
        use std::sync::OnceLock;
        static SCHEMA: OnceLock<Vec<ParamSpec>> = OnceLock::new();
        SCHEMA.get_or_init(|| vec![ParamSpec::required("query", ParamType::String)])
    }

    async fn execute(&self, args: &Value, state: &VehicleState) -> ToolOutput {
        let query = args["query"].as_str().unwrap_or_default().to_string();
        state.set("media_now_playing", Value::String(query.clone()));
        state.set("media_playing", Value::Bool(true));
        ToolOutput::ok(format!("now playing: {query}"))
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sets_now_playing() {
        let state = VehicleState::new();
        let out = PlayMusic.execute(&json!({ "query": "jazz" }), &state).await;
        assert!(out.success);
        assert_eq!(state.get("media_now_playing"), Some(json!("jazz")));
    }
}

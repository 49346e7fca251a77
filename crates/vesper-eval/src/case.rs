// SPDX-License-Identifier: Apache-2.0
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One line of the evaluation JSONL input: `{query, expected_agent,
/// expected_response, category}`. `follow_ups` extends that wire schema
/// for multi-turn cases, supplying scripted follow-up utterances for a
/// `waiting_input` round — absent in the plain four-field format, an
/// empty default.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvalCase {
    pub query: String,
    pub expected_agent: String,
    pub expected_response: String,
    pub category: String,
    #[serde(default)]
    pub follow_ups: Vec<String>,
}

/// Parses one case per non-blank line. A malformed line aborts the whole
/// read — evaluation input is operator-authored, not an untrusted feed.
pub fn read_cases(path: impl AsRef<Path>) -> anyhow::Result<Vec<EvalCase>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str::<EvalCase>(line).map_err(anyhow::Error::from))
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_one_case_per_line_and_skips_blanks() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("vesper-eval-test-{}.jsonl", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            "{\"query\": \"play jazz\", \"expected_agent\": \"music_agent\", \"expected_response\": \"Playing jazz\", \"category\": \"music\"}\n\n{\"query\": \"hi\", \"expected_agent\": \"chat_agent\", \"expected_response\": \"Hello\", \"category\": \"chat\"}\n",
        )
        .unwrap();

        let cases = read_cases(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].expected_agent, "music_agent");
        assert!(cases[0].follow_ups.is_empty());
    }

    #[test]
    fn malformed_line_is_an_error() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("vesper-eval-test-{}.jsonl", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not json\n").unwrap();
        let result = read_cases(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}

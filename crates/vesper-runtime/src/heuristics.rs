// SPDX-License-Identifier: Apache-2.0
/// "Asking for more info" heuristic, a stopgap pending the structured
/// `{action: ...}` response shape below.
const INTERROGATIVE_TOKENS: &[&str] = &["which", "what", "who", "where", "when", "how", "请问", "哪个", "哪", "什么"];

pub fn looks_like_a_question(text: &str) -> bool {
    if text.contains('?') || text.contains('\u{ff1f}') {
        return true;
    }
    let lowered = text.to_lowercase();
    INTERROGATIVE_TOKENS.iter().any(|token| lowered.contains(token))
}

/// The structured response shape to prefer over the heuristic above when
/// the model supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredAction {
    AskUser,
    CallTool,
    Final,
}

pub fn parse_structured_action(value: &serde_json::Value) -> Option<StructuredAction> {
    match value.get("action").and_then(serde_json::Value::as_str)? {
        "ask_user" => Some(StructuredAction::AskUser),
        "call_tool" => Some(StructuredAction::CallTool),
        "final" => Some(StructuredAction::Final),
        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_mark_is_detected() {
        assert!(looks_like_a_question("which song?"));
    }

    #[test]
    fn interrogative_token_without_question_mark_is_detected() {
        assert!(looks_like_a_question("please tell me which city"));
    }

    #[test]
    fn plain_statement_is_not_a_question() {
        assert!(!looks_like_a_question("playing your jazz playlist now"));
    }

    #[test]
    fn structured_action_parses_known_variants() {
        assert_eq!(parse_structured_action(&json!({"action": "ask_user"})), Some(StructuredAction::AskUser));
        assert_eq!(parse_structured_action(&json!({"action": "call_tool"})), Some(StructuredAction::CallTool));
        assert_eq!(parse_structured_action(&json!({"action": "final"})), Some(StructuredAction::Final));
    }

    #[test]
    fn structured_action_is_none_for_unknown_or_missing() {
        assert_eq!(parse_structured_action(&json!({})), None);
        assert_eq!(parse_structured_action(&json!({"action": "dance"})), None);
    }
}

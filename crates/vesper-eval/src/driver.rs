// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use vesper_core::{
    AgentResponse, AsrSuccess, Dispatch, Event, EventBus, EventHandler, EventKind, EventPayload,
    MessageTracker, TraceStatus,
};
use vesper_model::{CompletionRequest, Message, ModelProvider};

use crate::case::EvalCase;
use crate::report::{EvalCaseResult, EvalReport};

/// Tuning knobs for the polling loop. `max_rounds` bounds how many
/// `waiting_input` follow-ups a single case can go through, so a case that
/// never settles can't stall the whole batch indefinitely.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub max_rounds: u32,
    pub poll_interval: Duration,
    pub poll_timeout: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self { max_rounds: 5, poll_interval: Duration::from_millis(20), poll_timeout: Duration::from_secs(10) }
    }
}

/// Subscribed to `agent_response` so the evaluator can read back which
/// agent answered and what it said — the tracker's trace records stages,
/// not the responding agent's name, so this side-channel is how the
/// evaluator recovers it.
struct ResponseCapture {
    responses: Arc<Mutex<HashMap<Uuid, AgentResponse>>>,
}

#[async_trait]
impl EventHandler for ResponseCapture {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        if let (EventPayload::AgentResponse(response), Some(id)) = (&event.payload, event.correlation_id) {
            self.responses.lock().expect("evaluator response map mutex poisoned").insert(id, response.clone());
        }
        Ok(())
    }
}

/// Batch evaluation driver. Feeds synthetic utterances directly onto the
/// bus as `asr_recognition_success` events, bypassing capture/wakeword/
/// VAD/ASR, and scores whatever comes back.
pub struct Evaluator {
    bus: Arc<EventBus>,
    tracker: Arc<MessageTracker>,
    judge: Arc<dyn ModelProvider>,
    config: EvaluatorConfig,
    responses: Arc<Mutex<HashMap<Uuid, AgentResponse>>>,
}

impl Evaluator {
    pub fn new(bus: Arc<EventBus>, tracker: Arc<MessageTracker>, judge: Arc<dyn ModelProvider>, config: EvaluatorConfig) -> Self {
        let responses = Arc::new(Mutex::new(HashMap::new()));
        bus.subscribe(EventKind::AgentResponse, Arc::new(ResponseCapture { responses: responses.clone() }), Dispatch::Fast);
        Self { bus, tracker, judge, config, responses }
    }

    /// Runs every case in sequence (evaluation cases share no cross-case
    /// session state, and running one at a time keeps the single
    /// configured evaluation user's session stack clean between cases).
    pub async fn run(&self, cases: Vec<EvalCase>) -> EvalReport {
        let mut results = Vec::with_capacity(cases.len());
        for case in cases {
            results.push(self.run_case(case).await);
        }
        EvalReport::new(results)
    }

    async fn run_case(&self, case: EvalCase) -> EvalCaseResult {
        let start = Instant::now();
        let mut follow_ups = case.follow_ups.iter();
        let mut correlation_id = self.publish_utterance(&case.query).await;
        let mut rounds = 0u32;
        let status;

        loop {
            match self.poll_until_settled(correlation_id).await {
                Some(TraceStatus::WaitingInput) => {
                    rounds += 1;
                    if rounds > self.config.max_rounds {
                        status = "waiting_input";
                        break;
                    }
                    match follow_ups.next() {
                        Some(follow_up) => correlation_id = self.publish_utterance(follow_up).await,
                        None => {
                            status = "waiting_input";
                            break;
                        }
                    }
                }
                Some(_terminal) => {
                    status = "completed";
                    break;
                }
                None => {
                    status = "timed_out";
                    break;
                }
            }
        }

        let latency_ms = start.elapsed().as_millis() as u64;
        let captured = self.responses.lock().expect("evaluator response map mutex poisoned").get(&correlation_id).cloned();
        let actual_agent = captured.as_ref().map(|r| r.agent.clone());
        let actual_response = captured.as_ref().map(|r| r.message.clone());
        let agent_match = actual_agent.as_deref() == Some(case.expected_agent.as_str());
        let response_pass = self.score_response(&case.expected_response, actual_response.as_deref()).await;

        EvalCaseResult {
            query: case.query,
            category: case.category,
            expected_agent: case.expected_agent,
            actual_agent,
            expected_response: case.expected_response,
            actual_response,
            agent_match,
            response_pass,
            latency_ms,
            status: status.to_string(),
        }
    }

    async fn publish_utterance(&self, text: &str) -> Uuid {
        let id = self.tracker.create_message_id();
        let payload = AsrSuccess { text: text.to_string(), confidence: 1.0, latency_ms: 0 };
        self.bus.publish(Event::new(EventKind::AsrRecognitionSuccess, "evaluator", EventPayload::AsrSuccess(payload)).with_correlation(id)).await;
        id
    }

    /// Polls until the trace reaches a terminal status or `waiting_input`,
    /// or the configured timeout elapses.
    async fn poll_until_settled(&self, id: Uuid) -> Option<TraceStatus> {
        let deadline = Instant::now() + self.config.poll_timeout;
        loop {
            if let Some(trace) = self.tracker.get_trace(id) {
                if self.tracker.is_terminal(id) {
                    return Some(trace.status);
                }
                if trace.status == TraceStatus::WaitingInput {
                    return Some(TraceStatus::WaitingInput);
                }
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Response-quality scoring: an LLM judge, falling back to a simple
    /// substring rule on `llm_call_failed` or a malformed judge reply
    /// (same failure-handling shape as the orchestrator's LLM calls).
    async fn score_response(&self, expected: &str, actual: Option<&str>) -> bool {
        let Some(actual) = actual else { return expected.is_empty() };

        let prompt = format!(
            "Expected response: \"{expected}\"\nActual response: \"{actual}\"\n\n\
             Does the actual response adequately satisfy the same user need as the expected \
             response? Minor wording differences are fine. Respond with JSON: {{\"pass\": bool}}."
        );
        let request = CompletionRequest { messages: vec![Message::system("You grade assistant responses for an evaluation harness."), Message::user(prompt)], want_json: true, ..Default::default() };

        match self.judge.complete(request).await {
            Ok(response) => match serde_json::from_str::<serde_json::Value>(&response.text) {
                Ok(value) => match value.get("pass").and_then(serde_json::Value::as_bool) {
                    Some(pass) => pass,
                    None => rule_based_response_pass(expected, actual),
                },
                Err(_) => rule_based_response_pass(expected, actual),
            },
            Err(err) => {
                warn!(error = %err, "llm_call_failed judging response quality, falling back to substring rule");
                rule_based_response_pass(expected, actual)
            }
        }
    }
}

fn rule_based_response_pass(expected: &str, actual: &str) -> bool {
    if expected.is_empty() {
        return true;
    }
    actual.to_lowercase().contains(&expected.to_lowercase())
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vesper_core::{AgentResponseStatus, SessionAction, SessionAware};
    use vesper_model::ScriptedMockProvider;

    /// Stands in for the whole capture→agent pipeline: on the synthetic
    /// `asr_recognition_success` event the evaluator publishes, marks the
    /// trace completed and publishes a matching `agent_response`, exactly
    /// as the real adapters would after their own processing.
    struct EchoAgent {
        bus: Arc<EventBus>,
        tracker: Arc<MessageTracker>,
    }

    #[async_trait]
    impl EventHandler for EchoAgent {
        async fn handle(&self, event: Event) -> anyhow::Result<()> {
            let EventPayload::AsrSuccess(asr) = &event.payload else { return Ok(()) };
            let Some(id) = event.correlation_id else { return Ok(()) };

            self.tracker.update_response(id, format!("echo: {}", asr.text));
            self.tracker.set_status(id, TraceStatus::Completed);

            let response = AgentResponse {
                agent: "chat_agent".into(),
                query: asr.text.clone(),
                status: AgentResponseStatus::Completed,
                message: format!("echo: {}", asr.text),
                prompt: None,
                data: None,
                session_id: Some("s1".into()),
            };
            let ev = Event::new(EventKind::AgentResponse, "agent", EventPayload::AgentResponse(response))
                .with_correlation(id)
                .with_session(SessionAware { session_id: "s1".into(), action: SessionAction::Complete });
            self.bus.publish(ev).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn completed_case_is_scored_as_agent_match_and_response_pass() {
        let bus = Arc::new(EventBus::new());
        let tracker = Arc::new(MessageTracker::new());
        let judge = Arc::new(ScriptedMockProvider::always_text("{\"pass\": true}"));
        let config = EvaluatorConfig { poll_timeout: Duration::from_millis(500), poll_interval: Duration::from_millis(5), ..EvaluatorConfig::default() };
        let evaluator = Evaluator::new(bus.clone(), tracker.clone(), judge, config);

        bus.subscribe(EventKind::AsrRecognitionSuccess, Arc::new(EchoAgent { bus: bus.clone(), tracker: tracker.clone() }), Dispatch::Fast);

        let report = evaluator
            .run(vec![crate::case::EvalCase {
                query: "hello".into(),
                expected_agent: "chat_agent".into(),
                expected_response: "echo".into(),
                category: "chat".into(),
                follow_ups: vec![],
            }])
            .await;

        assert_eq!(report.cases.len(), 1);
        assert_eq!(report.cases[0].status, "completed");
        assert!(report.cases[0].agent_match);
        assert!(report.cases[0].response_pass);
        assert_eq!(report.cases[0].actual_response.as_deref(), Some("echo: hello"));
    }

    #[tokio::test]
    async fn no_response_within_timeout_is_reported_as_timed_out() {
        let bus = Arc::new(EventBus::new());
        let tracker = Arc::new(MessageTracker::new());
        let judge = Arc::new(ScriptedMockProvider::always_text("{\"pass\": true}"));
        let config = EvaluatorConfig { poll_timeout: Duration::from_millis(30), poll_interval: Duration::from_millis(5), ..EvaluatorConfig::default() };
        let evaluator = Evaluator::new(bus, tracker, judge, config);

        let report = evaluator
            .run(vec![crate::case::EvalCase { query: "hello".into(), expected_agent: "chat_agent".into(), expected_response: "".into(), category: "chat".into(), follow_ups: vec![] }])
            .await;

        assert_eq!(report.cases[0].status, "timed_out");
        assert!(!report.cases[0].agent_match);
    }

    #[tokio::test]
    async fn rule_based_fallback_matches_substring() {
        assert!(rule_based_response_pass("Playing jazz", "Sure, playing jazz now"));
        assert!(!rule_based_response_pass("Playing jazz", "I can't do that"));
        assert!(rule_based_response_pass("", "anything"));
    }

    #[tokio::test]
    async fn missing_response_fails_unless_expected_is_empty() {
        let bus = Arc::new(EventBus::new());
        let tracker = Arc::new(MessageTracker::new());
        let judge = Arc::new(ScriptedMockProvider::always_text("{\"pass\": true}"));
        let evaluator = Evaluator::new(bus, tracker, judge, EvaluatorConfig::default());
        assert!(!evaluator.score_response("something", None).await);
        assert!(evaluator.score_response("", None).await);
    }
}

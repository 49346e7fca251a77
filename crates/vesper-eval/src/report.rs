// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// One scored case in the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCaseResult {
    pub query: String,
    pub category: String,
    pub expected_agent: String,
    pub actual_agent: Option<String>,
    pub expected_response: String,
    pub actual_response: Option<String>,
    pub agent_match: bool,
    pub response_pass: bool,
    pub latency_ms: u64,
    /// `"completed"`, `"waiting_input"` (ran out of follow-ups/rounds),
    /// or `"timed_out"` (the tracker never reached a terminal/waiting
    /// status within the polling budget).
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalSummary {
    pub total: usize,
    pub agent_match_rate: f64,
    pub response_pass_rate: f64,
    pub overall_pass_rate: f64,
    pub avg_latency_ms: f64,
}

/// Top-level report JSON: `{summary: {...}, cases: [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub summary: EvalSummary,
    pub cases: Vec<EvalCaseResult>,
}

impl EvalReport {
    pub fn new(cases: Vec<EvalCaseResult>) -> Self {
        let total = cases.len();
        if total == 0 {
            return Self { summary: EvalSummary::default(), cases };
        }
        let agent_matches = cases.iter().filter(|c| c.agent_match).count();
        let response_passes = cases.iter().filter(|c| c.response_pass).count();
        let overall_passes = cases.iter().filter(|c| c.agent_match && c.response_pass).count();
        let avg_latency_ms = cases.iter().map(|c| c.latency_ms as f64).sum::<f64>() / total as f64;

        let summary = EvalSummary {
            total,
            agent_match_rate: agent_matches as f64 / total as f64,
            response_pass_rate: response_passes as f64 / total as f64,
            overall_pass_rate: overall_passes as f64 / total as f64,
            avg_latency_ms,
        };
        Self { summary, cases }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

// SPDX-License-Identifier: Apache-2.0
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use vesper_core::{AgentResponse, AgentResponseStatus};
use vesper_model::{CompletionRequest, Message, ModelProvider};

use crate::agent::{Agent, AgentRuntime};
use crate::profile::AgentContext;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("planner received a task naming an unknown agent: {0}")]
    UnknownAgent(String),
    #[error("planner model call failed: {0}")]
    LlmCallFailed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlannedTask {
    task_id: String,
    description: String,
    agent: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskPlan {
    tasks: Vec<PlannedTask>,
}

/// Outcome of one task in the plan, for the caller to inspect or render.
/// Per-task dispatch events with distinct session ids are the adapter
/// layer's responsibility, not this crate's — this crate only decides
/// which tasks ran and in what order.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task_id: String,
    pub agent: String,
    pub response: Option<AgentResponse>,
    pub skipped_due_to_failed_dependency: bool,
}

/// Meta-agent: decomposes a complex query into an ordered task plan,
/// executes tasks honoring `depends_on`, and summarizes outcomes with the
/// LLM. A failed task aborts only its own dependents.
pub struct Planner {
    model: Arc<dyn ModelProvider>,
    runtime: Arc<AgentRuntime>,
}

impl Planner {
    pub fn new(model: Arc<dyn ModelProvider>, runtime: Arc<AgentRuntime>) -> Self {
        Self { model, runtime }
    }

    async fn plan(&self, query: &str, agents: &HashMap<String, Agent>) -> Result<Vec<PlannedTask>, PlannerError> {
        let roster = agents.values().map(|a| format!("- {} ({})", a.profile().name, a.profile().description)).collect::<Vec<_>>().join("\n");
        let prompt = format!(
            "Available agents:\n{roster}\n\nComplex request: \"{query}\"\n\n\
             Decompose it into an ordered task list. Respond with JSON: \
             {{\"tasks\": [{{\"task_id\": string, \"description\": string, \"agent\": string, \"depends_on\": [string]}}]}}.",
        );
        let request = CompletionRequest { messages: vec![Message::system("You decompose complex requests into agent task plans."), Message::user(prompt)], want_json: true, ..Default::default() };

        let response = self.model.complete(request).await.map_err(|err| PlannerError::LlmCallFailed(err.to_string()))?;
        let plan: TaskPlan = serde_json::from_str(&response.text).map_err(|err| PlannerError::LlmCallFailed(format!("malformed plan JSON: {err}")))?;

        for task in &plan.tasks {
            if !agents.contains_key(&task.agent) {
                return Err(PlannerError::UnknownAgent(task.agent.clone()));
            }
        }
        Ok(plan.tasks)
    }

    /// Runs the plan to completion and returns one summarized
    /// [`AgentResponse`] plus the per-task breakdown.
    pub async fn run(&self, query: &str, agents: &HashMap<String, Agent>, user_id: &str) -> Result<(AgentResponse, Vec<TaskOutcome>), PlannerError> {
        let tasks = self.plan(query, agents).await?;

        let mut succeeded: HashSet<String> = HashSet::new();
        let mut failed: HashSet<String> = HashSet::new();
        let mut remaining: Vec<PlannedTask> = tasks.clone();
        let mut outcomes = Vec::new();

        while !remaining.is_empty() {
            let mut progressed = false;
            let mut still_remaining = Vec::new();

            for task in remaining {
                let blocked_by_failure = task.depends_on.iter().any(|dep| failed.contains(dep));
                let ready = task.depends_on.iter().all(|dep| succeeded.contains(dep) || failed.contains(dep));

                if blocked_by_failure {
                    failed.insert(task.task_id.clone());
                    outcomes.push(TaskOutcome { task_id: task.task_id.clone(), agent: task.agent.clone(), response: None, skipped_due_to_failed_dependency: true });
                    progressed = true;
                } else if ready {
                    let agent = agents.get(&task.agent).expect("validated present in plan()");
                    let mut ctx = AgentContext::new(user_id);
                    let response = self.runtime.run(agent, &task.description, &mut ctx).await;
                    if matches!(response.status, AgentResponseStatus::Error) {
                        failed.insert(task.task_id.clone());
                    } else {
                        succeeded.insert(task.task_id.clone());
                    }
                    outcomes.push(TaskOutcome { task_id: task.task_id.clone(), agent: task.agent.clone(), response: Some(response), skipped_due_to_failed_dependency: false });
                    progressed = true;
                } else {
                    still_remaining.push(task);
                }
            }

            if !progressed {
                warn!("planner detected a dependency cycle, aborting remaining tasks");
                for task in still_remaining {
                    outcomes.push(TaskOutcome { task_id: task.task_id.clone(), agent: task.agent.clone(), response: None, skipped_due_to_failed_dependency: true });
                }
                break;
            }
            remaining = still_remaining;
        }

        let summary = self.summarize(query, &outcomes).await;
        let overall_status = if failed.is_empty() { AgentResponseStatus::Completed } else { AgentResponseStatus::Error };
        let response = AgentResponse { agent: "planner".into(), query: query.to_string(), status: overall_status, message: summary, prompt: None, data: None, session_id: None };
        Ok((response, outcomes))
    }

    async fn summarize(&self, query: &str, outcomes: &[TaskOutcome]) -> String {
        let lines = outcomes
            .iter()
            .map(|o| match &o.response {
                Some(r) => format!("- {} ({}): {:?} — {}", o.task_id, o.agent, r.status, r.message),
                None => format!("- {} ({}): skipped (dependency failed)", o.task_id, o.agent),
            })
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!("Original request: \"{query}\"\n\nTask outcomes:\n{lines}\n\nSummarize the overall result for the user in one or two sentences.");
        match self.model.complete(CompletionRequest { messages: vec![Message::system("You summarize completed task plans."), Message::user(prompt)], ..Default::default() }).await {
            Ok(response) => response.text,
            Err(err) => {
                warn!(error = %err, "planner summary model call failed, returning raw task breakdown");
                lines
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

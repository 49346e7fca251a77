// SPDX-License-Identifier: Apache-2.0
use vesper_core::AgentResponse;

use crate::profile::{AgentContext, AgentProfile};
use crate::session_agent::SessionAgent;
use crate::simple::SimpleAgent;
use crate::tool_using::ToolUsingAgent;

/// A tagged variant rather than a trait-object hierarchy: one enum
/// dispatched by a single match in [`AgentRuntime::run`].
pub enum Agent {
    Simple(SimpleAgent),
    ToolUsing(ToolUsingAgent),
    Session(SessionAgent),
}

impl Agent {
    pub fn profile(&self) -> &AgentProfile {
        match self {
            Agent::Simple(a) => &a.profile,
            Agent::ToolUsing(a) => &a.profile,
            Agent::Session(a) => &a.profile,
        }
    }
}

/// Dispatches a query to whichever agent flavor it's given.
#[derive(Default)]
pub struct AgentRuntime;

impl AgentRuntime {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, agent: &Agent, query: &str, ctx: &mut AgentContext) -> AgentResponse {
        match agent {
            Agent::Simple(a) => a.handle(query, ctx).await,
            Agent::ToolUsing(a) => a.handle(query, ctx).await,
            Agent::Session(a) => a.process(query, ctx).await,
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

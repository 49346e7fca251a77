// SPDX-License-Identifier: Apache-2.0
mod decision;
mod orchestrator;

pub use decision::{OrchestratorContext, OrchestratorDecision, RouteAction};
pub use orchestrator::{Orchestrator, OrchestratorError};

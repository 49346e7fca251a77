// SPDX-License-Identifier: Apache-2.0
mod manager;
mod session;

pub use manager::{CompleteOutcome, SessionError, SessionManager};
pub use session::{AgentSession, SessionStack, SessionState};

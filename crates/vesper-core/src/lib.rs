// SPDX-License-Identifier: Apache-2.0
mod adapter;
mod bus;
mod event;
mod state;
mod tracker;

pub use adapter::{Adapter, AdapterError, AdapterStats};
pub use bus::{Dispatch, EventBus, EventHandler, FrameConsumer, SubscriptionId};
pub use event::{
    next_seq, AgentDispatchRequest, AgentResponse, AgentResponseStatus, AsrFailure, AsrSuccess,
    AudioFrame, Event, EventKind, EventPayload, SessionAction, SessionAware, StateChangePayload,
    TtsSpeakRequest, VadBoundary, WakewordHit,
};
pub use state::{PipelineState, StateEvent, StateMachine};
pub use tracker::{MessageTrace, MessageTracker, TraceEntry, TraceStatus};

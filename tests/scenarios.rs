// SPDX-License-Identifier: Apache-2.0
//! Cross-crate scenarios, run against the orchestrator and
//! agent adapters wired onto one bus the way `register_coordination_adapters`
//! wires them in `src/main.rs`, with scripted model providers standing in
//! for a real LLM.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use vesper_adapters::{ActiveSessionIndex, AgentAdapter, OrchestratorAdapter};
use vesper_config::AgentConfig;
use vesper_core::{
    AgentDispatchRequest, AgentResponse, AgentResponseStatus, AsrSuccess, Dispatch, Event, EventBus, EventHandler, EventKind, EventPayload, MessageTracker, SessionAction, SessionAware,
    StateMachine,
};
use vesper_mcp::{McpRequest, McpServer};
use vesper_memory::{MemoryStore, RecallMode, VectorStore};
use vesper_model::{EmbeddingProvider, ModelProvider, ScriptedMockProvider};
use vesper_orchestrator::Orchestrator;
use vesper_runtime::{Agent, AgentProfile, AgentRuntime, SessionAgent, ToolUsingAgent};
use vesper_session::SessionManager;
use vesper_tools::{builtin, ToolRegistry, VehicleState};

const USER_ID: &str = "local-user";

/// Captures every event it sees. Subscribed with `Dispatch::Fast`, the same
/// mode the real adapters use, so by the time a top-level `publish().await`
/// returns the whole cascade it triggered has already run and been
/// recorded — no polling needed.
struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Vec::new())))
    }

    fn of_kind(&self, kind: EventKind) -> Vec<Event> {
        self.0.lock().expect("recorder mutex poisoned").iter().filter(|e| e.kind == kind).cloned().collect()
    }
}

#[async_trait]
impl EventHandler for Recorder {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        self.0.lock().expect("recorder mutex poisoned").push(event);
        Ok(())
    }
}

fn agent_config(name: &str, priority: u8, interruptible: bool, capabilities: &[&str]) -> AgentConfig {
    AgentConfig { name: name.into(), description: String::new(), priority, interruptible, enabled: true, capabilities: capabilities.iter().map(|c| c.to_string()).collect() }
}

fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new(
        Default::default(),
        std::env::temp_dir().join(format!("vesper-scenarios-{}", Uuid::new_v4())),
        VectorStore::open_in_memory().expect("in-memory vector store"),
        Arc::new(vesper_model::MockEmbeddingProvider::new(8)),
        Arc::new(ScriptedMockProvider::always_text("{}")),
    ))
}

/// Everything a scenario needs: the bus with both coordination adapters
/// registered, the session manager and active-session index they share, and
/// a recorder subscribed to every event kind a test might want to inspect.
struct Harness {
    bus: Arc<EventBus>,
    sessions: Arc<SessionManager>,
    active_sessions: Arc<ActiveSessionIndex>,
    recorder: Arc<Recorder>,
}

fn build_harness(agent_configs: Vec<AgentConfig>, agents: HashMap<String, Agent>, orchestrator_model: Arc<dyn ModelProvider>) -> Harness {
    let bus = Arc::new(EventBus::new());
    let state_machine = Arc::new(StateMachine::new());
    let sessions = Arc::new(SessionManager::new(300));
    let active_sessions = Arc::new(ActiveSessionIndex::new());
    let tracker = Arc::new(MessageTracker::new());

    let recorder = Recorder::new();
    for kind in [EventKind::AgentDispatchRequest, EventKind::AgentResponse, EventKind::TtsSpeakRequest] {
        bus.subscribe(kind, recorder.clone(), Dispatch::Fast);
    }

    let orchestrator = Orchestrator::new(orchestrator_model);
    let orchestrator_adapter = Arc::new(OrchestratorAdapter::new(orchestrator, bus.clone(), state_machine, active_sessions.clone(), agent_configs.clone(), USER_ID));
    bus.subscribe(EventKind::AsrRecognitionSuccess, orchestrator_adapter, Dispatch::Fast);

    let agent_adapter = Arc::new(AgentAdapter::new(agents, agent_configs, Arc::new(AgentRuntime::new()), sessions.clone(), active_sessions.clone(), bus.clone(), tracker, memory_store()));
    bus.subscribe(EventKind::AgentDispatchRequest, agent_adapter, Dispatch::Fast);

    Harness { bus, sessions, active_sessions, recorder }
}

async fn publish_utterance(bus: &EventBus, text: &str, correlation: Uuid) {
    let payload = EventPayload::AsrSuccess(AsrSuccess { text: text.into(), confidence: 0.95, latency_ms: 5 });
    bus.publish(Event::new(EventKind::AsrRecognitionSuccess, "asr", payload).with_correlation(correlation)).await;
}

fn dispatch_responses(recorder: &Recorder) -> Vec<AgentResponse> {
    recorder.of_kind(EventKind::AgentResponse).into_iter().filter_map(|e| match e.payload { EventPayload::AgentResponse(r) => Some(r), _ => None }).collect()
}

// ─── S1: priority preemption ───────────────────────────────────────────────

/// Music is playing (low priority, interruptible); a
/// navigation request comes in for a higher-priority, non-interruptible
/// agent. Expect music paused, navigation session created, then music
/// promoted back to running once navigation finishes.
#[tokio::test]
async fn s1_higher_priority_request_preempts_a_running_lower_priority_session() {
    let navigation_agent = ToolUsingAgent::new(
        AgentProfile::from(&agent_config("navigation_agent", 80, false, &["导航"])),
        Arc::new(ScriptedMockProvider::always_text("已为您导航到北京故宫")),
        Arc::new(ToolRegistry::new()),
        Arc::new(VehicleState::new()),
        "sys",
    );
    let mut agents = HashMap::new();
    agents.insert("navigation_agent".to_string(), Agent::ToolUsing(navigation_agent));

    let agent_configs = vec![agent_config("navigation_agent", 80, false, &["导航"]), agent_config("music_agent", 20, true, &["音乐"])];
    let orchestrator_model = ScriptedMockProvider::new(vec![vesper_model::CompletionResponse { text: r#"{"is_new_intent":true,"reasoning":"navigation request while music plays"}"#.into(), ..Default::default() }]);
    let harness = build_harness(agent_configs, agents, Arc::new(orchestrator_model));

    // Music is already running, bypassing the adapter pipeline the same way
    // a prior turn would have put it there.
    let music_session = harness.sessions.create("music_agent", USER_ID, 20, true).expect("first session for a user is always created");
    harness.active_sessions.set(USER_ID, &music_session.session_id, "music_agent");

    publish_utterance(&harness.bus, "导航到北京故宫", Uuid::new_v4()).await;

    let responses = dispatch_responses(&harness.recorder);
    assert_eq!(responses.len(), 1, "navigation_agent should have produced exactly one response");
    let nav_response = &responses[0];
    assert_eq!(nav_response.agent, "navigation_agent");
    assert_eq!(nav_response.status, AgentResponseStatus::Success);
    let nav_session_id = nav_response.session_id.clone().expect("response stamped with its session id");
    assert_ne!(nav_session_id, music_session.session_id, "navigation must run in its own session, not music's");

    let music_after = harness.sessions.get(&music_session.session_id).expect("preempted session still tracked, now paused/resumed");
    assert_eq!(music_after.state, vesper_session::SessionState::Running, "music resumes once navigation completes");
    assert_eq!(harness.active_sessions.get(USER_ID), Some((music_session.session_id.clone(), "music_agent".to_string())));
}

// ─── S2: multi-turn tool agent ─────────────────────────────────────────────

/// The agent asks a clarifying question, the session parks
/// `waiting_input`, and the follow-up utterance resumes and completes it.
#[tokio::test]
async fn s2_waiting_input_session_resumes_on_next_utterance_and_completes() {
    let mut registry = ToolRegistry::new();
    builtin::register_all(&mut registry);
    let tools = Arc::new(registry);

    let music_model = ScriptedMockProvider::new(vec![
        vesper_model::CompletionResponse { text: "好的,请问想听什么歌?".into(), ..Default::default() },
        vesper_model::CompletionResponse {
            text: String::new(),
            tool_calls: vec![vesper_model::ToolCallRequest { id: "1".into(), name: "play_music".into(), arguments: serde_json::json!({ "query": "周杰伦的晴天" }).to_string() }],
            usage: Default::default(),
        },
        vesper_model::CompletionResponse { text: "好的,正在播放周杰伦的晴天".into(), ..Default::default() },
    ]);
    let music_agent = ToolUsingAgent::new(AgentProfile::from(&agent_config("music_agent", 20, true, &["音乐"])), Arc::new(music_model), tools, Arc::new(VehicleState::new()), "sys");
    let mut agents = HashMap::new();
    agents.insert("music_agent".to_string(), Agent::ToolUsing(music_agent));

    let agent_configs = vec![agent_config("music_agent", 20, true, &["音乐"])];
    let orchestrator_model = ScriptedMockProvider::new(vec![
        vesper_model::CompletionResponse { text: r#"{"selected_agent":"music_agent","confidence":0.9,"reasoning":"play music"}"#.into(), ..Default::default() },
        vesper_model::CompletionResponse { text: r#"{"is_new_intent":false,"reasoning":"answers the pending question"}"#.into(), ..Default::default() },
    ]);
    let harness = build_harness(agent_configs, agents, Arc::new(orchestrator_model));

    publish_utterance(&harness.bus, "播放音乐", Uuid::new_v4()).await;
    let first = dispatch_responses(&harness.recorder);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, AgentResponseStatus::WaitingInput);
    assert_eq!(first[0].prompt.as_deref(), Some("好的,请问想听什么歌?"));
    let session_id = first[0].session_id.clone().expect("waiting_input response carries its session id");
    assert_eq!(harness.sessions.get(&session_id).expect("session exists").state, vesper_session::SessionState::WaitingInput);

    publish_utterance(&harness.bus, "周杰伦的晴天", Uuid::new_v4()).await;
    let responses = dispatch_responses(&harness.recorder);
    assert_eq!(responses.len(), 2, "second utterance produces a second response");
    let second = &responses[1];
    assert_eq!(second.status, AgentResponseStatus::Success);
    assert_eq!(second.session_id.as_deref(), Some(session_id.as_str()), "resumed turn stays in the same session");
    assert!(harness.active_sessions.get(USER_ID).is_none(), "session is complete, no longer the active one");
}

// ─── S3: interrupt and resume ───────────────────────────────────────────────

/// A hotel-booking session is parked on a clarifying
/// question; an unrelated vehicle-control request preempts it; once that
/// finishes, the hotel session resumes with its original prompt intact.
#[tokio::test]
async fn s3_waiting_input_session_is_preempted_and_its_prompt_replays_on_resume() {
    let hotel_model = ScriptedMockProvider::always_text(r#"{"slots":{}}"#);
    let hotel_agent = SessionAgent::new(
        AgentProfile::from(&agent_config("hotel_agent", 60, true, &["酒店"])),
        Arc::new(hotel_model),
        Arc::new(ToolRegistry::new()),
        Arc::new(VehicleState::new()),
        vec!["city".into()],
        "book_hotel",
    );

    let mut registry = ToolRegistry::new();
    builtin::register_all(&mut registry);
    let vehicle_agent = ToolUsingAgent::new(
        AgentProfile::from(&agent_config("vehicle_control_agent", 50, true, &["车窗"])),
        Arc::new(ScriptedMockProvider::always_text("已为您打开主驾驶车窗")),
        Arc::new(registry),
        Arc::new(VehicleState::new()),
        "sys",
    );

    let mut agents = HashMap::new();
    agents.insert("hotel_agent".to_string(), Agent::Session(hotel_agent));
    agents.insert("vehicle_control_agent".to_string(), Agent::ToolUsing(vehicle_agent));

    let agent_configs = vec![agent_config("hotel_agent", 60, true, &["酒店"]), agent_config("vehicle_control_agent", 50, true, &["车窗"])];
    let orchestrator_model = ScriptedMockProvider::new(vec![
        vesper_model::CompletionResponse { text: r#"{"selected_agent":"hotel_agent","confidence":0.9,"reasoning":"hotel booking"}"#.into(), ..Default::default() },
        vesper_model::CompletionResponse { text: r#"{"is_new_intent":true,"reasoning":"unrelated vehicle control request"}"#.into(), ..Default::default() },
    ]);
    let harness = build_harness(agent_configs, agents, Arc::new(orchestrator_model));

    publish_utterance(&harness.bus, "帮我订酒店", Uuid::new_v4()).await;
    let first = dispatch_responses(&harness.recorder);
    assert_eq!(first[0].status, AgentResponseStatus::WaitingInput);
    assert_eq!(first[0].prompt.as_deref(), Some("What's the city?"));
    let hotel_session_id = first[0].session_id.clone().expect("hotel session id");

    // A session manager rule independent of relative priority: once a
    // session is `waiting_input`, any new dispatch may preempt it.
    publish_utterance(&harness.bus, "打开主驾驶车窗", Uuid::new_v4()).await;
    let responses = dispatch_responses(&harness.recorder);
    assert_eq!(responses.len(), 2);
    let vehicle_response = &responses[1];
    assert_eq!(vehicle_response.agent, "vehicle_control_agent");
    assert_eq!(vehicle_response.status, AgentResponseStatus::Success);
    let vehicle_session_id = vehicle_response.session_id.clone().expect("vehicle session id");
    assert_ne!(vehicle_session_id, hotel_session_id);

    let hotel_after = harness.sessions.get(&hotel_session_id).expect("hotel session still tracked after being paused");
    assert_eq!(hotel_after.state, vesper_session::SessionState::Running, "hotel session resumes once vehicle control completes");
    assert_eq!(hotel_after.prompt.as_deref(), Some("What's the city?"), "its pending prompt replays unchanged");
    assert_eq!(harness.active_sessions.get(USER_ID), Some((hotel_session_id, "hotel_agent".to_string())));
}

// ─── S4: composite dispatch under one correlation id ───────────────────────

/// A planner would decompose one query into
/// independent per-agent tasks sharing a correlation id. No adapter wires
/// `vesper_runtime::Planner` onto the bus today (its own doc comment defers
/// session-id stamping to "the adapter layer"), so this exercises the
/// invariant the adapter layer is actually responsible for: three dispatch
/// requests sharing one correlation id each mint their own distinct session,
/// the way a planner-aware adapter would rely on.
#[tokio::test]
async fn s4_dispatch_requests_sharing_a_correlation_id_each_get_a_distinct_session() {
    let names = ["navigation_agent", "music_agent", "vehicle_control_agent"];
    let mut agents = HashMap::new();
    let mut agent_configs = Vec::new();
    for name in names {
        agent_configs.push(agent_config(name, 50, true, &[]));
        let agent = ToolUsingAgent::new(AgentProfile::from(&agent_config(name, 50, true, &[])), Arc::new(ScriptedMockProvider::always_text("done")), Arc::new(ToolRegistry::new()), Arc::new(VehicleState::new()), "sys");
        agents.insert(name.to_string(), Agent::ToolUsing(agent));
    }

    let harness = build_harness(agent_configs, agents, Arc::new(ScriptedMockProvider::always_text("{}")));
    let correlation = Uuid::new_v4();

    for (i, name) in names.iter().enumerate() {
        let payload = EventPayload::AgentDispatchRequest(AgentDispatchRequest { user_id: USER_ID.into(), query: format!("task {i}"), agent: name.to_string() });
        harness.bus.publish(Event::new(EventKind::AgentDispatchRequest, "planner", payload).with_correlation(correlation)).await;
    }

    let responses = dispatch_responses(&harness.recorder);
    assert_eq!(responses.len(), 3);
    let session_ids: std::collections::HashSet<String> = responses.iter().map(|r| r.session_id.clone().expect("every dispatch is stamped with a session id")).collect();
    assert_eq!(session_ids.len(), 3, "each task in the composite plan gets its own session, not a shared one");

    let dispatches = harness.recorder.of_kind(EventKind::AgentDispatchRequest);
    assert_eq!(dispatches.len(), 3);
    assert!(dispatches.iter().all(|e| e.correlation_id == Some(correlation)), "every task in the plan shares the same correlation id");
}

// ─── S5: MCP rejection ──────────────────────────────────────────────────────

/// A `tools/call` missing a required parameter is rejected
/// with `INVALID_PARAMS`, naming the real field (`celsius`).
#[tokio::test]
async fn s5_tools_call_missing_required_param_is_invalid_params() {
    let mut registry = ToolRegistry::new();
    builtin::register_all(&mut registry);
    let server = McpServer::new(Default::default(), Arc::new(registry), Arc::new(VehicleState::new()));

    let request = McpRequest { id: serde_json::json!(1), method: "tools/call".into(), params: serde_json::json!({ "name": "set_temperature", "arguments": { "zone": "driver" } }) };
    let response = server.handle(request).await;

    let error = response.error.expect("missing required parameter must be rejected");
    assert_eq!(error.code, vesper_mcp::INVALID_PARAMS);
    assert_eq!(error.message, "missing required parameter: celsius");
}

// ─── S6: semantic recall ────────────────────────────────────────────────────

/// Deterministic stand-in for a real embedding model: buckets text into a
/// "navigation" or "music" direction in a 2-dimensional space by keyword, so
/// cosine similarity genuinely separates the two topics the way a real
/// embedding model would. [`vesper_model::MockEmbeddingProvider`] is pure
/// hash noise with no relationship to text content, so it cannot stand in
/// for this scenario.
struct KeywordEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddingProvider {
    fn name(&self) -> &str {
        "keyword-stub"
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.contains('导') {
            Ok(vec![1.0, 0.0])
        } else if text.contains('播') || text.contains('杰') {
            Ok(vec![0.0, 1.0])
        } else {
            Ok(vec![0.0, 0.0])
        }
    }
}

/// Two short-term memories are recorded, a navigation one
/// and a music one; recalling with a navigation-flavored query ranks the
/// navigation entry first and leaves the music entry below threshold.
#[tokio::test]
async fn s6_related_recall_ranks_the_semantically_closer_entry_above_threshold() {
    let store = MemoryStore::new(
        Default::default(),
        std::env::temp_dir().join(format!("vesper-scenarios-s6-{}", Uuid::new_v4())),
        VectorStore::open_in_memory().expect("in-memory vector store"),
        Arc::new(KeywordEmbeddingProvider),
        Arc::new(ScriptedMockProvider::always_text("{}")),
    );

    store.append(USER_ID, "导航到中关村", "正在规划路线", "navigation_agent", true, 1).await.expect("append navigation memory");
    store.append(USER_ID, "播放周杰伦", "已播放", "music_agent", true, 2).await.expect("append music memory");

    let related = store.recall(USER_ID, RecallMode::Related { query: "导航去公司".into(), top_k: 5, recent_n: 0 }).await.expect("recall succeeds");

    assert_eq!(related.len(), 1, "only the navigation entry clears the 0.7 similarity threshold");
    assert_eq!(related[0].memory.query, "导航到中关村");
    assert!(related[0].score >= 0.7);
}

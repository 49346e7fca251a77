// SPDX-License-Identifier: Apache-2.0
mod cli;

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};

use vesper_adapters::mock::{MockAudioSource, MockRecognizer, MockSynthesizer, MockVad, MockWakewordDetector};
use vesper_adapters::{ActiveSessionIndex, AgentAdapter, AsrAdapter, AudioAdapter, GuiAdapter, OrchestratorAdapter, TtsAdapter, VadAdapter, WakewordAdapter};
use vesper_config::{AgentConfig, Config};
use vesper_controller::Controller;
use vesper_core::{EventBus, MessageTracker, StateMachine};
use vesper_eval::{read_cases, Evaluator, EvaluatorConfig};
use vesper_mcp::{McpRequest, McpServer};
use vesper_memory::{MemoryStore, VectorStore};
use vesper_model::ModelProvider;
use vesper_orchestrator::Orchestrator;
use vesper_runtime::{Agent, AgentProfile, AgentRuntime, SessionAgent, SimpleAgent, ToolUsingAgent};
use vesper_session::SessionManager;
use vesper_tools::{builtin, ToolRegistry, VehicleState};

/// Single configured end user this binary serves. Multi-tenant routing is
/// out of scope, so the orchestrator and agent adapters are wired against
/// one fixed id rather than a connection-derived one.
const USER_ID: &str = "local-user";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::ShowConfig { config } => {
            let config = vesper_config::load(config.as_deref())?;
            println!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Commands::Completions { shell } => {
            cli::print_completions(*shell);
            Ok(())
        }
        Commands::Run { config } => run_pipeline(config.as_deref()).await,
        Commands::Eval { cases, config, out } => run_eval(cases, config.as_deref(), out.as_deref()).await,
        Commands::Mcp { config } => run_mcp(config.as_deref()).await,
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry().with(fmt::layer().with_target(false).with_writer(std::io::stderr)).with(filter).try_init();
}

/// Everything the pipeline and the evaluator both depend on: bus, tracker,
/// state machine, session manager, memory, tool registry, vehicle state, and
/// the agent roster built from configuration.
struct Core {
    config: Config,
    bus: Arc<EventBus>,
    tracker: Arc<MessageTracker>,
    state_machine: Arc<StateMachine>,
    sessions: Arc<SessionManager>,
    memory: Arc<MemoryStore>,
    tools: Arc<ToolRegistry>,
    vehicle_state: Arc<VehicleState>,
    active_sessions: Arc<ActiveSessionIndex>,
    model: Arc<dyn ModelProvider>,
    controller: Arc<Controller>,
}

async fn build_core(config_override: Option<&Path>) -> anyhow::Result<Core> {
    let config = vesper_config::load(config_override).context("loading configuration")?;

    let bus = Arc::new(EventBus::new());
    let tracker = Arc::new(MessageTracker::new());
    let state_machine = Arc::new(StateMachine::new());

    let sessions = Arc::new(SessionManager::new(config.session.ttl_seconds as i64).with_bus(bus.clone()));
    let _ttl_sweeper = sessions.spawn_ttl_sweeper(std::time::Duration::from_secs(config.session.ttl_sweep_interval_secs));

    let model = vesper_model::provider_from_config(&config.model).context("constructing model provider")?;
    let embeddings = vesper_model::embedding_provider_from_config(&config.model).context("constructing embedding provider")?;
    let vectors = VectorStore::open(&config.pipeline.memory.vector_db_path).context("opening vector store")?;
    let memory = Arc::new(MemoryStore::new(config.pipeline.memory.clone(), config.pipeline.memory.long_term_file.clone(), vectors, embeddings, model.clone()));

    let mut registry = ToolRegistry::new();
    builtin::register_all(&mut registry);
    let tools = Arc::new(registry);

    let vehicle_state = Arc::new(VehicleState::new());
    let active_sessions = Arc::new(ActiveSessionIndex::new());
    let controller = Arc::new(Controller::new(bus.clone()));

    Ok(Core { config, bus, tracker, state_machine, sessions, memory, tools, vehicle_state, active_sessions, model, controller })
}

/// Picks an [`Agent`] flavor per configured agent. `AgentConfig` carries no
/// explicit kind discriminant, so the kind is inferred from the fallback
/// name and capability tags: the configured fallback is a free-form
/// [`SimpleAgent`]; an agent tagged `travel` runs the hotel-booking
/// slot-filling [`SessionAgent`]; everything else gets the general-purpose
/// [`ToolUsingAgent`] bound to the full tool registry.
fn build_agents(configs: &[AgentConfig], model: Arc<dyn ModelProvider>, tools: Arc<ToolRegistry>, state: Arc<VehicleState>) -> HashMap<String, Agent> {
    configs
        .iter()
        .filter(|cfg| cfg.enabled)
        .map(|cfg| {
            let profile = AgentProfile::from(cfg);
            let system_prompt = if cfg.description.is_empty() { format!("You are {}, a vehicle assistant agent.", cfg.name) } else { cfg.description.clone() };

            let agent = if cfg.name == AgentConfig::fallback_name() {
                Agent::Simple(SimpleAgent::new(profile, model.clone(), system_prompt))
            } else if cfg.capabilities.iter().any(|cap| cap == "travel") {
                Agent::Session(SessionAgent::new(profile, model.clone(), tools.clone(), state.clone(), vec!["city".into(), "check_in".into(), "check_out".into()], "book_hotel"))
            } else {
                Agent::ToolUsing(ToolUsingAgent::new(profile, model.clone(), tools.clone(), state.clone(), system_prompt))
            };
            (cfg.name.clone(), agent)
        })
        .collect()
}

/// Registers the orchestrator and agent adapters every run mode needs.
/// Registration order is initialize/start order: the orchestrator must be
/// live before the agent adapter can see its `agent_dispatch_request`
/// events.
async fn register_coordination_adapters(core: &Core) {
    let orchestrator = Orchestrator::new(core.model.clone());
    let orchestrator_adapter = Arc::new(OrchestratorAdapter::new(
        orchestrator,
        core.bus.clone(),
        core.state_machine.clone(),
        core.active_sessions.clone(),
        core.config.agents.clone(),
        USER_ID,
    ));
    core.controller.register(orchestrator_adapter).await;

    let agents = build_agents(&core.config.agents, core.model.clone(), core.tools.clone(), core.vehicle_state.clone());
    let agent_adapter = Arc::new(AgentAdapter::new(
        agents,
        core.config.agents.clone(),
        Arc::new(AgentRuntime::new()),
        core.sessions.clone(),
        core.active_sessions.clone(),
        core.bus.clone(),
        core.tracker.clone(),
        core.memory.clone(),
    ));
    core.controller.register(agent_adapter).await;
}

async fn run_pipeline(config_override: Option<&Path>) -> anyhow::Result<()> {
    let core = build_core(config_override).await?;

    // Audio capture, the wakeword model, VAD, ASR, and TTS are external
    // collaborators out of scope for this binary; the mocks stand in for
    // them, the same way `vesper-adapters::mock` is documented to run as a
    // real `--mock` mode rather than only under test.
    let audio_source = Arc::new(MockAudioSource::new(Vec::new()));
    let audio = Arc::new(AudioAdapter::new(audio_source, core.bus.clone()));
    let wakeword_detector = Arc::new(MockWakewordDetector { keyword: "hey vesper".into(), threshold: 2_000 });
    let wakeword = Arc::new(WakewordAdapter::new(wakeword_detector, core.bus.clone(), core.state_machine.clone()));
    let vad_detector = Arc::new(MockVad::new(core.config.pipeline.audio.chunk_size, 1_500));
    let vad = Arc::new(VadAdapter::new(vad_detector, core.bus.clone(), core.state_machine.clone(), core.config.pipeline.audio.sample_rate));
    let recognizer = Arc::new(MockRecognizer { scripted_text: String::new(), confidence: 1.0 });
    let asr = Arc::new(AsrAdapter::new(recognizer, core.bus.clone(), core.state_machine.clone(), core.tracker.clone()));
    let synthesizer = Arc::new(MockSynthesizer::new());
    let tts = Arc::new(TtsAdapter::new(synthesizer, core.bus.clone(), core.tracker.clone()));
    let gui = Arc::new(GuiAdapter::new());

    core.controller.register(audio).await;
    core.controller.register(wakeword).await;
    core.controller.register(vad).await;
    core.controller.register(asr).await;

    register_coordination_adapters(&core).await;

    core.controller.register(tts).await;
    core.controller.register(gui).await;

    core.controller.initialize().await.context("initializing pipeline")?;
    core.controller.start().await.context("starting pipeline")?;
    info!("pipeline started, press ctrl-c to stop");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutdown requested");
    core.controller.stop().await;
    core.controller.cleanup().await;
    Ok(())
}

async fn run_eval(cases_path: &Path, config_override: Option<&Path>, out: Option<&Path>) -> anyhow::Result<()> {
    let core = build_core(config_override).await?;
    register_coordination_adapters(&core).await;

    core.controller.initialize().await.context("initializing evaluator pipeline")?;
    core.controller.start().await.context("starting evaluator pipeline")?;

    let cases = read_cases(cases_path).with_context(|| format!("reading evaluation cases from {}", cases_path.display()))?;
    info!(count = cases.len(), "loaded evaluation cases");

    let evaluator = Evaluator::new(core.bus.clone(), core.tracker.clone(), core.model.clone(), EvaluatorConfig::default());
    let report = evaluator.run(cases).await;

    core.controller.stop().await;
    core.controller.cleanup().await;

    let rendered = serde_json::to_string_pretty(&report)?;
    match out {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Serves the MCP tool-calling wire surface over newline-delimited JSON:
/// one `McpRequest` per input line, one `McpResponse` per output line.
async fn run_mcp(config_override: Option<&Path>) -> anyhow::Result<()> {
    let config = vesper_config::load(config_override).context("loading configuration")?;
    let mut registry = ToolRegistry::new();
    builtin::register_all(&mut registry);
    let registry = Arc::new(registry);
    let state = Arc::new(VehicleState::new());
    let server = McpServer::new(config.mcp, registry, state);

    let stdin = std::io::stdin();
    let mut stdin = stdin.lock();
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = stdin.read_line(&mut line).context("reading MCP request line")?;
        if bytes == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let request: McpRequest = match serde_json::from_str(trimmed) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "malformed MCP request line, skipping");
                continue;
            }
        };
        let response = server.handle(request).await;
        println!("{}", serde_json::to_string(&response)?);
    }
    Ok(())
}

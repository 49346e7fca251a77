// SPDX-License-Identifier: Apache-2.0
mod active_session_index;
mod agent_adapter;
mod asr;
mod audio;
mod collaborators;
mod gui;
pub mod mock;
mod orchestrator_adapter;
mod tts;
mod vad;
mod wakeword;

pub use active_session_index::ActiveSessionIndex;
pub use agent_adapter::AgentAdapter;
pub use asr::AsrAdapter;
pub use audio::AudioAdapter;
pub use collaborators::{AudioSource, RecognizedSpeech, SpeechRecognizer, SpeechSynthesizer, VadSignal, VoiceActivityDetector, WakewordDetector};
pub use gui::GuiAdapter;
pub use orchestrator_adapter::OrchestratorAdapter;
pub use tts::TtsAdapter;
pub use vad::VadAdapter;
pub use wakeword::WakewordAdapter;

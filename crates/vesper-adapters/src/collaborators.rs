// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use async_trait::async_trait;
use vesper_core::{AdapterError, AudioFrame, WakewordHit};

/// External-collaborator traits for the pipeline-stage adapters. Each module
/// adapter talks to its hardware or ML backend exclusively through one of
/// these, so the adapter's event-handling logic is unit-testable without a
/// microphone, a wakeword model, or a real TTS engine.

/// Produces raw audio frames. `capture` resolves to `None` once the source is
/// closed (device unplugged, end of a recorded fixture, ...).
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn capture(&self) -> Option<AudioFrame>;
}

/// Runs a wakeword model over one frame at a time.
pub trait WakewordDetector: Send + Sync {
    fn detect(&self, frame: &AudioFrame) -> Option<WakewordHit>;
}

/// What a [`VoiceActivityDetector`] observed after consuming one chunk.
#[derive(Debug, Clone)]
pub enum VadSignal {
    Silence,
    SpeechStart,
    SpeechEnd { audio: Arc<[u8]> },
}

/// VAD models operate on fixed-size chunks; the adapter rebuffers incoming
/// frames to `required_frame_samples` before calling `process`.
pub trait VoiceActivityDetector: Send + Sync {
    fn required_frame_samples(&self) -> usize;
    fn process(&self, frame: &AudioFrame) -> VadSignal;
}

#[derive(Debug, Clone)]
pub struct RecognizedSpeech {
    pub text: String,
    pub confidence: f32,
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self, audio: &[u8]) -> Result<RecognizedSpeech, AdapterError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), AdapterError>;
}

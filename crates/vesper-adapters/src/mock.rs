// SPDX-License-Identifier: Apache-2.0
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vesper_core::{AdapterError, AudioFrame, WakewordHit};

use crate::collaborators::{AudioSource, RecognizedSpeech, SpeechRecognizer, SpeechSynthesizer, VadSignal, VoiceActivityDetector, WakewordDetector};

/// Hardware-free collaborator stand-ins, mirroring `vesper-model`'s mock
/// provider: deployable as the real `--mock` run mode, not only in tests.

/// Yields a fixed, pre-recorded sequence of frames and then closes.
pub struct MockAudioSource {
    frames: Mutex<std::collections::VecDeque<AudioFrame>>,
}

impl MockAudioSource {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self { frames: Mutex::new(frames.into()) }
    }
}

#[async_trait]
impl AudioSource for MockAudioSource {
    async fn capture(&self) -> Option<AudioFrame> {
        self.frames.lock().expect("mock audio source mutex poisoned").pop_front()
    }
}

/// Fires whenever a frame's energy (mean absolute sample value) crosses
/// `threshold`, reporting `keyword`.
pub struct MockWakewordDetector {
    pub keyword: String,
    pub threshold: i64,
}

impl WakewordDetector for MockWakewordDetector {
    fn detect(&self, frame: &AudioFrame) -> Option<WakewordHit> {
        let energy = frame.samples.iter().map(|s| (*s as i64).abs()).sum::<i64>() / (frame.samples.len().max(1) as i64);
        if energy >= self.threshold {
            Some(WakewordHit { keyword: self.keyword.clone(), confidence: 0.9 })
        } else {
            None
        }
    }
}

/// Toggles speech/silence on an energy threshold, buffering samples while in
/// speech so `SpeechEnd` carries the whole utterance.
pub struct MockVad {
    pub frame_samples: usize,
    pub energy_threshold: i64,
    in_speech: Mutex<bool>,
    captured: Mutex<Vec<i16>>,
}

impl MockVad {
    pub fn new(frame_samples: usize, energy_threshold: i64) -> Self {
        Self { frame_samples, energy_threshold, in_speech: Mutex::new(false), captured: Mutex::new(Vec::new()) }
    }
}

impl VoiceActivityDetector for MockVad {
    fn required_frame_samples(&self) -> usize {
        self.frame_samples
    }

    fn process(&self, frame: &AudioFrame) -> VadSignal {
        let energy = frame.samples.iter().map(|s| (*s as i64).abs()).sum::<i64>() / (frame.samples.len().max(1) as i64);
        let speaking = energy >= self.energy_threshold;
        let mut in_speech = self.in_speech.lock().expect("mock vad mutex poisoned");
        let mut captured = self.captured.lock().expect("mock vad mutex poisoned");

        if speaking {
            captured.extend(frame.samples.iter().map(|s| *s));
            if !*in_speech {
                *in_speech = true;
                return VadSignal::SpeechStart;
            }
            VadSignal::Silence
        } else if *in_speech {
            *in_speech = false;
            let bytes: Vec<u8> = captured.drain(..).flat_map(|s| s.to_le_bytes()).collect();
            VadSignal::SpeechEnd { audio: Arc::from(bytes) }
        } else {
            VadSignal::Silence
        }
    }
}

/// Echoes back a canned transcript regardless of the audio bytes given.
pub struct MockRecognizer {
    pub scripted_text: String,
    pub confidence: f32,
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn recognize(&self, _audio: &[u8]) -> Result<RecognizedSpeech, AdapterError> {
        Ok(RecognizedSpeech { text: self.scripted_text.clone(), confidence: self.confidence })
    }
}

/// Records every utterance it was asked to speak instead of driving a
/// speaker, so tests (and a headless `--mock` run) can assert on output.
#[derive(Default)]
pub struct MockSynthesizer {
    spoken: Mutex<Vec<String>>,
    calls: AtomicU64,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("mock synthesizer mutex poisoned").clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), AdapterError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.spoken.lock().expect("mock synthesizer mutex poisoned").push(text.to_string());
        Ok(())
    }
}

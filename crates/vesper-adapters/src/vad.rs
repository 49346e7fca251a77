// SPDX-License-Identifier: Apache-2.0
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vesper_core::{Adapter, AdapterError, AdapterStats, AudioFrame, Event, EventBus, EventKind, EventPayload, FrameConsumer, StateEvent, StateMachine, VadBoundary};

use crate::collaborators::{VadSignal, VoiceActivityDetector};

/// Buffers frames to the detector's required size; emits
/// `vad_speech_start`/`vad_speech_end` with the captured blob.
pub struct VadAdapter {
    detector: Arc<dyn VoiceActivityDetector>,
    bus: Arc<EventBus>,
    state_machine: Arc<StateMachine>,
    sample_rate: u32,
    buffer: Mutex<Vec<i16>>,
    stats: Mutex<AdapterStats>,
}

impl VadAdapter {
    pub fn new(detector: Arc<dyn VoiceActivityDetector>, bus: Arc<EventBus>, state_machine: Arc<StateMachine>, sample_rate: u32) -> Self {
        Self { detector, bus, state_machine, sample_rate, buffer: Mutex::new(Vec::new()), stats: Mutex::new(AdapterStats::default()) }
    }

    fn publish_boundary(&self, signal: VadSignal) {
        let (kind, state_event, payload) = match signal {
            VadSignal::Silence => return,
            VadSignal::SpeechStart => (EventKind::VadSpeechStart, StateEvent::SpeechStart, EventPayload::VadBoundary(VadBoundary::Start)),
            VadSignal::SpeechEnd { audio } => (EventKind::VadSpeechEnd, StateEvent::SpeechEnd, EventPayload::VadBoundary(VadBoundary::End { audio })),
        };
        let transition = self.state_machine.apply(state_event, "vad boundary");
        let bus = self.bus.clone();
        tokio::spawn(async move {
            if let Some((from, to, reason)) = transition {
                bus.publish(Event::new(EventKind::StateChange, "vad", EventPayload::StateChange(vesper_core::StateChangePayload { from, to, reason }))).await;
            }
            bus.publish(Event::new(kind, "vad", payload)).await;
        });
    }
}

impl FrameConsumer for VadAdapter {
    fn on_frame(&self, frame: &AudioFrame) {
        let required = self.detector.required_frame_samples();
        let mut buffer = self.buffer.lock().expect("vad buffer mutex poisoned");
        buffer.extend_from_slice(&frame.samples);

        while buffer.len() >= required {
            let chunk: Vec<i16> = buffer.drain(0..required).collect();
            let sub_frame = AudioFrame { seq: frame.seq, samples: Arc::from(chunk), sample_rate: self.sample_rate };
            let signal = self.detector.process(&sub_frame);
            self.stats.lock().expect("vad adapter stats mutex poisoned").record(0.0, false);
            self.publish_boundary(signal);
        }
    }
}

#[async_trait]
impl Adapter for VadAdapter {
    fn name(&self) -> &str {
        "vad"
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn statistics(&self) -> AdapterStats {
        self.stats.lock().expect("vad adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockVad;
    use vesper_core::PipelineState;

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame { seq: 0, samples: Arc::from(samples), sample_rate: 16_000 }
    }

    #[tokio::test]
    async fn speech_then_silence_emits_start_then_end() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        sm.apply(StateEvent::WakewordTriggered, "wake");
        let adapter = VadAdapter::new(Arc::new(MockVad::new(4, 1000)), bus, sm.clone(), 16_000);

        adapter.on_frame(&frame(vec![20_000, 20_000, 20_000, 20_000]));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sm.current(), PipelineState::Listening);

        adapter.on_frame(&frame(vec![0, 0, 0, 0]));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sm.current(), PipelineState::Recognizing);
    }

    #[test]
    fn partial_chunk_is_buffered_not_processed() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        let adapter = VadAdapter::new(Arc::new(MockVad::new(8, 1000)), bus, sm.clone(), 16_000);
        adapter.on_frame(&frame(vec![20_000, 20_000]));
        assert_eq!(adapter.buffer.lock().unwrap().len(), 2);
    }
}

// SPDX-License-Identifier: Apache-2.0
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tracing::warn;
use vesper_core::{
    Adapter, AdapterError, AdapterStats, AsrFailure, AsrSuccess, Event, EventBus, EventHandler, EventKind, EventPayload, MessageTracker, StateEvent,
    StateMachine, VadBoundary,
};

use crate::collaborators::SpeechRecognizer;

/// On `vad_speech_end`, dispatches recognition on a worker with a single
/// in-flight task policy; emits `asr_recognition_success` or `_failed`. A
/// recognition request that arrives while one is already in flight is
/// dropped rather than queued, leaving a `busy`-marked trace entry.
pub struct AsrAdapter {
    recognizer: Arc<dyn SpeechRecognizer>,
    bus: Arc<EventBus>,
    state_machine: Arc<StateMachine>,
    tracker: Arc<MessageTracker>,
    busy: AtomicBool,
    stats: Mutex<AdapterStats>,
}

impl AsrAdapter {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, bus: Arc<EventBus>, state_machine: Arc<StateMachine>, tracker: Arc<MessageTracker>) -> Self {
        Self { recognizer, bus, state_machine, tracker, busy: AtomicBool::new(false), stats: Mutex::new(AdapterStats::default()) }
    }
}

#[async_trait]
impl EventHandler for AsrAdapter {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let audio = match event.payload {
            EventPayload::VadBoundary(VadBoundary::End { audio }) => audio,
            _ => return Ok(()),
        };

        if self.busy.swap(true, Ordering::SeqCst) {
            let id = self.tracker.create_message_id();
            self.tracker.add_trace(id, "asr", format!("{} bytes", audio.len()), "dropped: recognizer busy");
            self.tracker.mark_aborted(id);
            warn!("dropping vad_speech_end, recognizer already has a recognition in flight");
            return Ok(());
        }

        self.state_machine.apply(StateEvent::RecognitionStart, "asr dispatch");
        self.bus.publish(Event::new(EventKind::AsrRecognitionStart, "asr", EventPayload::Empty)).await;

        let start = Instant::now();
        match self.recognizer.recognize(&audio).await {
            Ok(recognized) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                let id = self.tracker.create_message_id();
                self.tracker.update_query(id, recognized.text.clone());
                self.tracker.add_trace(id, "asr", format!("{} bytes", audio.len()), recognized.text.clone());
                self.state_machine.apply(StateEvent::RecognitionSuccess, "asr ok");
                self.stats.lock().expect("asr adapter stats mutex poisoned").record(latency_ms as f64, false);
                self.bus
                    .publish(
                        Event::new(
                            EventKind::AsrRecognitionSuccess,
                            "asr",
                            EventPayload::AsrSuccess(AsrSuccess { text: recognized.text, confidence: recognized.confidence, latency_ms }),
                        )
                        .with_correlation(id),
                    )
                    .await;
            }
            Err(err) => {
                let latency_ms = start.elapsed().as_millis() as f64;
                self.state_machine.apply(StateEvent::RecognitionFailed, "asr failed");
                self.stats.lock().expect("asr adapter stats mutex poisoned").record(latency_ms, true);
                self.bus.publish(Event::new(EventKind::AsrRecognitionFailed, "asr", EventPayload::AsrFailure(AsrFailure { reason: err.to_string() }))).await;
            }
        }

        self.busy.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl Adapter for AsrAdapter {
    fn name(&self) -> &str {
        "asr"
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
        self.stats.lock().expect("asr adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRecognizer;
    use vesper_core::PipelineState;

    fn end_event(audio: Vec<u8>) -> Event {
        Event::new(EventKind::VadSpeechEnd, "vad", EventPayload::VadBoundary(VadBoundary::End { audio: Arc::from(audio) }))
    }

    #[tokio::test]
    async fn successful_recognition_advances_state_and_publishes_success() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        sm.apply(StateEvent::WakewordTriggered, "wake");
        sm.apply(StateEvent::SpeechStart, "start");
        sm.apply(StateEvent::SpeechEnd, "end");
        let tracker = Arc::new(MessageTracker::new());
        let adapter = AsrAdapter::new(Arc::new(MockRecognizer { scripted_text: "play jazz".into(), confidence: 0.95 }), bus, sm.clone(), tracker);

        adapter.handle(end_event(vec![1, 2, 3])).await.unwrap();
        assert_eq!(sm.current(), PipelineState::Deciding);
    }

    #[tokio::test]
    async fn second_call_while_busy_is_dropped_without_advancing_state() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        sm.apply(StateEvent::WakewordTriggered, "wake");
        sm.apply(StateEvent::SpeechStart, "start");
        sm.apply(StateEvent::SpeechEnd, "end");
        let tracker = Arc::new(MessageTracker::new());
        let adapter = AsrAdapter::new(Arc::new(MockRecognizer { scripted_text: "hi".into(), confidence: 0.9 }), bus, sm.clone(), tracker);

        adapter.busy.store(true, Ordering::SeqCst);
        let before = sm.current();
        adapter.handle(end_event(vec![9, 9])).await.unwrap();
        assert_eq!(sm.current(), before, "a dropped recognition must not advance the state machine");
    }

    #[tokio::test]
    async fn unrelated_event_kind_is_ignored() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        let tracker = Arc::new(MessageTracker::new());
        let adapter = AsrAdapter::new(Arc::new(MockRecognizer { scripted_text: "hi".into(), confidence: 0.9 }), bus, sm.clone(), tracker);
        adapter.handle(Event::new(EventKind::VadSpeechStart, "vad", EventPayload::VadBoundary(VadBoundary::Start))).await.unwrap();
        assert_eq!(sm.current(), PipelineState::Idle);
    }
}

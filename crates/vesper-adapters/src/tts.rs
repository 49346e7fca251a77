// SPDX-License-Identifier: Apache-2.0
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::warn;
use vesper_core::{Adapter, AdapterError, AdapterStats, Event, EventBus, EventHandler, EventKind, EventPayload, MessageTracker, TraceStatus};

use crate::collaborators::SpeechSynthesizer;

/// Consumes `tts_speak_request`, drives the speaker, finalizes the trace.
pub struct TtsAdapter {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    bus: Arc<EventBus>,
    tracker: Arc<MessageTracker>,
    stats: Mutex<AdapterStats>,
}

impl TtsAdapter {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, bus: Arc<EventBus>, tracker: Arc<MessageTracker>) -> Self {
        Self { synthesizer, bus, tracker, stats: Mutex::new(AdapterStats::default()) }
    }
}

#[async_trait]
impl EventHandler for TtsAdapter {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let text = match &event.payload {
            EventPayload::TtsSpeakRequest(r) => r.text.clone(),
            _ => return Ok(()),
        };

        match self.synthesizer.speak(&text).await {
            Ok(()) => {
                self.stats.lock().expect("tts adapter stats mutex poisoned").record(0.0, false);
                if let Some(id) = event.correlation_id {
                    if !self.tracker.is_terminal(id) {
                        self.tracker.add_trace(id, "tts", text, "spoken");
                        self.tracker.finalize(id, TraceStatus::Completed);
                    }
                }
            }
            Err(err) => {
                self.stats.lock().expect("tts adapter stats mutex poisoned").record(0.0, true);
                warn!(error = %err, "speech synthesis failed");
                if let Some(id) = event.correlation_id {
                    self.tracker.mark_aborted(id);
                }
            }
        }
        self.bus.publish(Event::new(EventKind::TtsSpeakDone, "tts", EventPayload::Empty)).await;
        Ok(())
    }
}

#[async_trait]
impl Adapter for TtsAdapter {
    fn name(&self) -> &str {
        "tts"
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
        self.stats.lock().expect("tts adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

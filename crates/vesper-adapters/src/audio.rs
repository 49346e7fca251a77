// SPDX-License-Identifier: Apache-2.0
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use vesper_core::{Adapter, AdapterError, AdapterStats, EventBus};

use crate::collaborators::AudioSource;

/// Starts the capture loop and emits `audio_frame_ready` directly to frame
/// consumers. The only adapter that never touches the generic handler
/// table.
pub struct AudioAdapter {
    source: Arc<dyn AudioSource>,
    bus: Arc<EventBus>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
    stats: Mutex<AdapterStats>,
}

impl AudioAdapter {
    pub fn new(source: Arc<dyn AudioSource>, bus: Arc<EventBus>) -> Self {
        Self { source, bus, running: Arc::new(AtomicBool::new(false)), task: Mutex::new(None), stats: Mutex::new(AdapterStats::default()) }
    }
}

#[async_trait]
impl Adapter for AudioAdapter {
    fn name(&self) -> &str {
        "audio"
    }

    async fn initialize(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn start(&self) -> Result<(), AdapterError> {
        self.running.store(true, Ordering::SeqCst);
        let source = self.source.clone();
        let bus = self.bus.clone();
        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match source.capture().await {
                    Some(frame) => bus.publish_frame(frame),
                    None => {
                        debug!("audio source closed, stopping capture loop");
                        break;
                    }
                }
            }
        });
        *self.task.lock().expect("audio adapter task mutex poisoned") = Some(handle);
        info!("audio capture loop started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AdapterError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().expect("audio adapter task mutex poisoned").take() {
            handle.abort();
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn statistics(&self) -> AdapterStats {
        self.stats.lock().expect("audio adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockAudioSource;
    use vesper_core::AudioFrame;

    fn frame(seq: u64) -> AudioFrame {
        AudioFrame { seq, samples: Arc::from(vec![0i16; 4]), sample_rate: 16_000 }
    }

    #[tokio::test]
    async fn start_drains_frames_to_the_bus() {
        let bus = Arc::new(EventBus::new());
        let source = Arc::new(MockAudioSource::new(vec![frame(0), frame(1)]));
        let adapter = AudioAdapter::new(source, bus.clone());
        adapter.start().await.unwrap();
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        adapter.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_idempotent_without_a_prior_start() {
        let bus = Arc::new(EventBus::new());
        let source = Arc::new(MockAudioSource::new(vec![]));
        let adapter = AudioAdapter::new(source, bus);
        assert!(adapter.stop().await.is_ok());
    }
}

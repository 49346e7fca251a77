// SPDX-License-Identifier: Apache-2.0
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use vesper_core::{Adapter, AdapterError, AdapterStats, AudioFrame, Event, EventBus, EventKind, EventPayload, FrameConsumer, StateEvent, StateMachine};

use crate::collaborators::WakewordDetector;

/// Consumes frames; on a hit, emits `wakeword_detected` and feeds the state
/// machine `wakeword_triggered`.
pub struct WakewordAdapter {
    detector: Arc<dyn WakewordDetector>,
    bus: Arc<EventBus>,
    state_machine: Arc<StateMachine>,
    stats: Mutex<AdapterStats>,
}

impl WakewordAdapter {
    pub fn new(detector: Arc<dyn WakewordDetector>, bus: Arc<EventBus>, state_machine: Arc<StateMachine>) -> Self {
        Self { detector, bus, state_machine, stats: Mutex::new(AdapterStats::default()) }
    }
}

impl FrameConsumer for WakewordAdapter {
    fn on_frame(&self, frame: &AudioFrame) {
        let Some(hit) = self.detector.detect(frame) else {
            return;
        };
        self.stats.lock().expect("wakeword adapter stats mutex poisoned").record(0.0, false);

        if let Some((from, to, reason)) = self.state_machine.apply(StateEvent::WakewordTriggered, "wakeword_detected") {
            let bus = self.bus.clone();
            tokio::spawn(async move {
                bus.publish(Event::new(EventKind::StateChange, "wakeword", EventPayload::StateChange(vesper_core::StateChangePayload { from, to, reason }))).await;
            });
        }

        let bus = self.bus.clone();
        tokio::spawn(async move {
            bus.publish(Event::new(EventKind::WakewordDetected, "wakeword", EventPayload::WakewordHit(hit))).await;
        });
    }
}

#[async_trait]
impl Adapter for WakewordAdapter {
    fn name(&self) -> &str {
        "wakeword"
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
        self.stats.lock().expect("wakeword adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockWakewordDetector;
    use vesper_core::PipelineState;

    fn loud_frame() -> AudioFrame {
        AudioFrame { seq: 0, samples: Arc::from(vec![20_000i16; 8]), sample_rate: 16_000 }
    }

    fn quiet_frame() -> AudioFrame {
        AudioFrame { seq: 0, samples: Arc::from(vec![0i16; 8]), sample_rate: 16_000 }
    }

    #[tokio::test]
    async fn loud_frame_triggers_state_transition() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        let adapter = WakewordAdapter::new(Arc::new(MockWakewordDetector { keyword: "hey vesper".into(), threshold: 1000 }), bus, sm.clone());
        adapter.on_frame(&loud_frame());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(sm.current(), PipelineState::WakeDetected);
    }

    #[test]
    fn quiet_frame_does_not_detect() {
        let bus = Arc::new(EventBus::new());
        let sm = Arc::new(StateMachine::new());
        let adapter = WakewordAdapter::new(Arc::new(MockWakewordDetector { keyword: "hey vesper".into(), threshold: 1000 }), bus, sm.clone());
        adapter.on_frame(&quiet_frame());
        assert_eq!(sm.current(), PipelineState::Idle);
    }
}

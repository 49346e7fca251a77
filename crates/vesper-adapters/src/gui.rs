// SPDX-License-Identifier: Apache-2.0
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use vesper_core::{Adapter, AdapterError, AdapterStats, Event, EventHandler};

const HISTORY_CAPACITY: usize = 200;

/// Subscribes to display-relevant events; pure sink. No downstream publish
/// of its own — the controller registers it on `state_change`,
/// `agent_response`, and `wakeword_detected`.
pub struct GuiAdapter {
    history: Mutex<VecDeque<Event>>,
    stats: Mutex<AdapterStats>,
}

impl GuiAdapter {
    pub fn new() -> Self {
        Self { history: Mutex::new(VecDeque::new()), stats: Mutex::new(AdapterStats::default()) }
    }

    /// Snapshot of the most recently observed display-relevant events,
    /// oldest first, for a UI layer to render.
    pub fn recent_events(&self) -> Vec<Event> {
        self.history.lock().expect("gui adapter history mutex poisoned").iter().cloned().collect()
    }
}

impl Default for GuiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventHandler for GuiAdapter {
    async fn handle(&self, event: Event) -> anyhow::Result<()> {
        let mut history = self.history.lock().expect("gui adapter history mutex poisoned");
        history.push_back(event);
        while history.len() > HISTORY_CAPACITY {
            history.pop_front();
        }
        drop(history);
        self.stats.lock().expect("gui adapter stats mutex poisoned").record(0.0, false);
        Ok(())
    }
}

#[async_trait]
impl Adapter for GuiAdapter {
    fn name(&self) -> &str {
        "gui"
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
        self.stats.lock().expect("gui adapter stats mutex poisoned").clone()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::{EventKind, EventPayload};

    #[tokio::test]
    async fn records_observed_events() {
        let gui = GuiAdapter::new();
        gui.handle(Event::new(EventKind::WakewordDetected, "wakeword", EventPayload::Empty)).await.unwrap();
        gui.handle(Event::new(EventKind::StateChange, "state", EventPayload::Empty)).await.unwrap();
        assert_eq!(gui.recent_events().len(), 2);
    }

    #[tokio::test]
    async fn history_is_capped() {
        let gui = GuiAdapter::new();
        for _ in 0..(HISTORY_CAPACITY + 10) {
            gui.handle(Event::new(EventKind::StateChange, "state", EventPayload::Empty)).await.unwrap();
        }
        assert_eq!(gui.recent_events().len(), HISTORY_CAPACITY);
    }
}

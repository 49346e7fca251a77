// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::event::{AudioFrame, Event, EventKind};

/// A subscriber's handler. Implementations should be cheap to clone behind
/// an `Arc` and must not panic — a handler that returns `Err` is logged and
/// does not affect delivery to the other handlers of the same event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> anyhow::Result<()>;
}

/// A frame consumer registered for the audio-frame fast path. Audio frame
/// events bypass the generic bus to avoid per-frame queue overhead — this
/// is the only special-cased event kind.
pub trait FrameConsumer: Send + Sync {
    fn on_frame(&self, frame: &AudioFrame);
}

/// Controls whether a subscription is invoked synchronously on the
/// publisher's task ("fast sink") or queued to a dedicated background task
/// that drains its own FIFO queue ("slow sink").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Fast,
    Queued,
}

struct Subscription {
    id: u64,
    mode: Dispatch,
    // Fast-path handlers are invoked inline; queued-path handlers are driven
    // by a background task reading from `queue_tx`'s paired receiver.
    handler: Arc<dyn EventHandler>,
    queue_tx: Option<mpsc::UnboundedSender<Event>>,
}

/// Opaque handle returned by [`EventBus::subscribe`], used to
/// [`EventBus::unsubscribe`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Typed publish/subscribe event bus.
///
/// Created once, before any module. Publication after [`EventBus::shutdown`]
/// silently drops the event (logged at `debug`).
pub struct EventBus {
    handlers: Mutex<HashMap<EventKind, Vec<Subscription>>>,
    frame_consumers: Mutex<Vec<Arc<dyn FrameConsumer>>>,
    next_id: AtomicU64,
    shutdown: AtomicBool,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(HashMap::new()),
            frame_consumers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Subscribe `handler` to events of `kind`. Returns an id for
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(
        &self,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
        mode: Dispatch,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let queue_tx = match mode {
            Dispatch::Fast => None,
            Dispatch::Queued => {
                let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
                let worker_handler = handler.clone();
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        if let Err(err) = worker_handler.handle(event).await {
                            warn!(%err, "queued event handler failed");
                        }
                    }
                });
                Some(tx)
            }
        };
        let mut handlers = self.handlers.lock().expect("bus handlers mutex poisoned");
        handlers
            .entry(kind)
            .or_default()
            .push(Subscription { id, mode, handler, queue_tx });
        SubscriptionId(id)
    }

    /// Register a direct audio-frame consumer (the one special-cased path
    /// that never touches the generic handler table).
    pub fn subscribe_frames(&self, consumer: Arc<dyn FrameConsumer>) {
        self.frame_consumers
            .lock()
            .expect("bus frame consumers mutex poisoned")
            .push(consumer);
    }

    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) {
        if let Some(subs) = self.handlers.lock().expect("bus handlers mutex poisoned").get_mut(&kind) {
            subs.retain(|s| s.id != id.0);
        }
    }

    /// Deliver an audio frame directly to every registered frame consumer,
    /// bypassing the generic handler table entirely.
    pub fn publish_frame(&self, frame: AudioFrame) {
        if self.shutdown.load(Ordering::Relaxed) {
            debug!("bus shut down, dropping audio frame");
            return;
        }
        let consumers = self.frame_consumers.lock().expect("bus frame consumers mutex poisoned");
        for c in consumers.iter() {
            c.on_frame(&frame);
        }
    }

    /// Publish an event. Fast-sink handlers run synchronously (awaited) on
    /// the caller's task, in subscription order; slow-sink handlers are
    /// hand off to their dedicated FIFO queue and run later on a background
    /// task. All handlers for a given kind see events for that kind in
    /// publication order.
    pub async fn publish(&self, event: Event) {
        if self.shutdown.load(Ordering::Relaxed) {
            debug!(kind = ?event.kind, "bus shut down, dropping event");
            return;
        }
        let fast_handlers: Vec<Arc<dyn EventHandler>>;
        let queued: Vec<mpsc::UnboundedSender<Event>>;
        {
            let handlers = self.handlers.lock().expect("bus handlers mutex poisoned");
            let subs = match handlers.get(&event.kind) {
                Some(s) => s,
                None => return,
            };
            fast_handlers = subs
                .iter()
                .filter(|s| s.mode == Dispatch::Fast)
                .map(|s| s.handler.clone())
                .collect();
            queued = subs
                .iter()
                .filter_map(|s| s.queue_tx.clone())
                .collect();
        }
        for tx in &queued {
            let _ = tx.send(event.clone());
        }
        for handler in &fast_handlers {
            if let Err(err) = handler.handle(event.clone()).await {
                warn!(%err, kind = ?event.kind, "fast-path event handler failed");
            }
        }
    }

    /// Stop accepting new publications. Already-queued slow-sink work keeps
    /// draining; the bus itself does not forcibly cancel background tasks
    /// (adapters own that via `Adapter::stop`).
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventPayload;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Mutex as AsyncMutex;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> anyhow::Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct OrderRecordingHandler {
        seen: Arc<AsyncMutex<Vec<u64>>>,
    }

    #[async_trait]
    impl EventHandler for OrderRecordingHandler {
        async fn handle(&self, event: Event) -> anyhow::Result<()> {
            self.seen.lock().await.push(event.seq);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: Event) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    fn ev(kind: EventKind) -> Event {
        Event::new(kind, "test", EventPayload::Empty)
    }

    #[tokio::test]
    async fn fast_handler_runs_synchronously() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventKind::WakewordDetected,
            Arc::new(CountingHandler { count: count.clone() }),
            Dispatch::Fast,
        );
        bus.publish(ev(EventKind::WakewordDetected)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unrelated_kind_not_delivered() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventKind::WakewordDetected,
            Arc::new(CountingHandler { count: count.clone() }),
            Dispatch::Fast,
        );
        bus.publish(ev(EventKind::VadSpeechStart)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn publish_after_shutdown_is_dropped() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventKind::WakewordDetected,
            Arc::new(CountingHandler { count: count.clone() }),
            Dispatch::Fast,
        );
        bus.shutdown();
        bus.publish(ev(EventKind::WakewordDetected)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_others() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventKind::StateChange, Arc::new(FailingHandler), Dispatch::Fast);
        bus.subscribe(
            EventKind::StateChange,
            Arc::new(CountingHandler { count: count.clone() }),
            Dispatch::Fast,
        );
        bus.publish(ev(EventKind::StateChange)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn queued_handler_eventually_sees_event() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(
            EventKind::AsrRecognitionStart,
            Arc::new(CountingHandler { count: count.clone() }),
            Dispatch::Queued,
        );
        bus.publish(ev(EventKind::AsrRecognitionStart)).await;
        // Give the background task a chance to drain.
        for _ in 0..50 {
            if count.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn events_of_same_kind_delivered_in_publication_order() {
        let bus = EventBus::new();
        let seen = Arc::new(AsyncMutex::new(Vec::new()));
        bus.subscribe(
            EventKind::AgentDispatchRequest,
            Arc::new(OrderRecordingHandler { seen: seen.clone() }),
            Dispatch::Fast,
        );
        for _ in 0..5 {
            bus.publish(ev(EventKind::AgentDispatchRequest)).await;
        }
        let seen = seen.lock().await;
        let mut sorted = seen.clone();
        sorted.sort();
        assert_eq!(*seen, sorted);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(
            EventKind::WakewordDetected,
            Arc::new(CountingHandler { count: count.clone() }),
            Dispatch::Fast,
        );
        bus.unsubscribe(EventKind::WakewordDetected, id);
        bus.publish(ev(EventKind::WakewordDetected)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    struct RecordingFrameConsumer {
        count: Arc<AtomicUsize>,
    }

    impl FrameConsumer for RecordingFrameConsumer {
        fn on_frame(&self, _frame: &AudioFrame) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn audio_frames_bypass_generic_bus() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe_frames(Arc::new(RecordingFrameConsumer { count: count.clone() }));
        bus.publish_frame(AudioFrame {
            seq: 0,
            samples: Arc::from(vec![0i16; 10]),
            sample_rate: 16_000,
        });
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

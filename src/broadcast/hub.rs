use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use crate::events::price::PriceUpdate;
use crate::observability::metrics::{SUBSCRIBERS, SUBSCRIBER_DROPS, UPDATES_PUBLISHED};
use crate::types::ids::SessionId;
use crate::types::timestamp::Timestamp;

pub type UpdateSender = mpsc::Sender<Arc<PriceUpdate>>;
pub type UpdateReceiver = mpsc::Receiver<Arc<PriceUpdate>>;

struct Subscriber {
    joined_at: Timestamp,
    tx: UpdateSender,
}

#[derive(Default)]
struct Registry {
    subscribers: HashMap<SessionId, Subscriber>,
    last: Option<Arc<PriceUpdate>>,
}

/// Outcome of one `publish` fan-out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: Vec<SessionId>,
}

/// Live subscriber registry and fan-out point.
///
/// Registration, removal and publish all run under one lock, so an update
/// in flight is delivered to exactly the subscribers registered when
/// `publish` took the lock.
pub struct BroadcastHub {
    registry: Mutex<Registry>,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Self {
        BroadcastHub {
            registry: Mutex::new(Registry::default()),
            buffer: buffer.max(1),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a session with its own queue. Dropping the `Subscription`
    /// unregisters it.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let session_id = SessionId::new();
        let (tx, rx) = mpsc::channel(self.buffer);
        self.register(session_id, tx);

        Subscription {
            hub: Arc::clone(self),
            session_id,
            rx,
        }
    }

    /// Add `tx` under `session_id` and replay the latest update to it alone.
    ///
    /// Returns false if the replay could not be delivered; the session is
    /// then not registered.
    pub fn register(&self, session_id: SessionId, tx: UpdateSender) -> bool {
        let mut registry = self.registry();

        if let Some(last) = &registry.last {
            if let Err(e) = tx.try_send(Arc::new(last.as_replay())) {
                warn!(session_id = %session_id, "Replay to new subscriber failed: {}", e);
                return false;
            }
        }

        registry.subscribers.insert(session_id, Subscriber {
            joined_at: Timestamp::wall_clock(),
            tx,
        });
        SUBSCRIBERS.set(registry.subscribers.len() as i64);
        info!(session_id = %session_id, subscribers = registry.subscribers.len(), "Subscriber connected");
        true
    }

    /// Deliver `update` to every registered subscriber.
    ///
    /// A subscriber whose queue is closed or full is removed; the rest still
    /// receive the update.
    pub fn publish(&self, update: PriceUpdate) -> PublishReport {
        let update = Arc::new(update);
        let mut registry = self.registry();
        let mut report = PublishReport::default();

        for (session_id, subscriber) in registry.subscribers.iter() {
            match subscriber.tx.try_send(Arc::clone(&update)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(session_id = %session_id, "Subscriber queue full, dropping session");
                    report.dropped.push(*session_id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(session_id = %session_id, "Subscriber channel closed, dropping session");
                    report.dropped.push(*session_id);
                }
            }
        }

        for session_id in &report.dropped {
            if let Some(subscriber) = registry.subscribers.remove(session_id) {
                let connected_ms = Timestamp::wall_clock()
                    .as_millis()
                    .saturating_sub(subscriber.joined_at.as_millis());
                info!(session_id = %session_id, connected_ms, "Subscriber removed after failed send");
            }
            SUBSCRIBER_DROPS.inc();
        }

        UPDATES_PUBLISHED.with_label_values(&[update.tier.label().as_str()]).inc();
        SUBSCRIBERS.set(registry.subscribers.len() as i64);
        registry.last = Some(update);
        report
    }

    /// Remove a subscriber. Returns whether it was registered.
    pub fn unsubscribe(&self, session_id: SessionId) -> bool {
        let mut registry = self.registry();
        let removed = registry.subscribers.remove(&session_id).is_some();
        if removed {
            SUBSCRIBERS.set(registry.subscribers.len() as i64);
            info!(session_id = %session_id, subscribers = registry.subscribers.len(), "Subscriber disconnected");
        }
        removed
    }

    /// Drop every subscriber; their queues close and sessions wind down.
    pub fn close_all(&self) -> usize {
        let mut registry = self.registry();
        let closed = registry.subscribers.len();
        registry.subscribers.clear();
        SUBSCRIBERS.set(0);
        if closed > 0 {
            info!(closed, "Closed all subscriber sessions");
        }
        closed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().subscribers.len()
    }

    pub fn is_subscribed(&self, session_id: SessionId) -> bool {
        self.registry().subscribers.contains_key(&session_id)
    }

    pub fn last_update(&self) -> Option<Arc<PriceUpdate>> {
        self.registry().last.clone()
    }
}

/// A registered session's receiving end.
pub struct Subscription {
    hub: Arc<BroadcastHub>,
    session_id: SessionId,
    rx: UpdateReceiver,
}

impl Subscription {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub async fn recv(&mut self) -> Option<Arc<PriceUpdate>> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Arc<PriceUpdate>> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.session_id);
    }
}

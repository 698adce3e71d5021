//! Synchronous in-process event bus.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use unifile_core::events::{DomainEvent, EventFilter};

/// A subscribed callback.
pub type EventListener = Arc<dyn Fn(&DomainEvent) + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Subscription {
    id: ListenerId,
    filter: EventFilter,
    listener: EventListener,
}

/// Delivers lifecycle events to listeners in subscription order.
///
/// Delivery is best-effort: nothing is persisted or replayed, and a
/// panicking listener is logged and skipped.
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribe `listener` to events matching `filter`.
    pub fn on<F>(&self, filter: impl Into<EventFilter>, listener: F) -> ListenerId
    where
        F: Fn(&DomainEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        subscriptions.push(Subscription {
            id,
            filter: filter.into(),
            listener: Arc::new(listener),
        });
        id
    }

    /// Remove a subscription. Returns `false` when `id` was not subscribed
    /// under `filter`.
    pub fn off(&self, filter: impl Into<EventFilter>, id: ListenerId) -> bool {
        let filter = filter.into();
        let mut subscriptions = self
            .subscriptions
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let before = subscriptions.len();
        subscriptions.retain(|s| !(s.id == id && s.filter == filter));
        subscriptions.len() != before
    }

    /// Deliver `event` to every matching listener.
    pub fn emit(&self, event: &DomainEvent) {
        let event_type = event.event_type();
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let listeners: Vec<EventListener> = self
            .subscriptions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|s| s.filter.matches(event_type))
            .map(|s| Arc::clone(&s.listener))
            .collect();

        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(
                    event = %event_type,
                    file_id = %event.file_id,
                    "Event listener panicked"
                );
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.subscriptions
            .read()
            .map(|s| s.len())
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

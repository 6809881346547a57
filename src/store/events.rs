/// Typed publish/subscribe bus for store changes
///
/// Subscribers register for one `Topic` and receive every `StoreEvent`
/// published on it. Dispatch is synchronous: `publish` returns after every
/// matching callback has run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::NaiveDate;

use crate::domain::{AppSettings, DailyGoal, HydrationDay, HydrationEntry, UserProfile, UserSettings};

/// Channels other components can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    DailyGoal,
    Entries,
    History,
    UserSettings,
    AppSettings,
    UserProfile,
    /// Fired once after a full wipe
    Cleared,
}

/// A change published by the store, carrying the new value
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    DailyGoalChanged(DailyGoal),
    EntriesChanged {
        date: NaiveDate,
        entries: Vec<HydrationEntry>,
    },
    HistoryChanged(Vec<HydrationDay>),
    UserSettingsChanged(UserSettings),
    AppSettingsChanged(AppSettings),
    UserProfileChanged(UserProfile),
    Cleared,
}

impl StoreEvent {
    /// The topic this event is delivered on
    pub fn topic(&self) -> Topic {
        match self {
            StoreEvent::DailyGoalChanged(_) => Topic::DailyGoal,
            StoreEvent::EntriesChanged { .. } => Topic::Entries,
            StoreEvent::HistoryChanged(_) => Topic::History,
            StoreEvent::UserSettingsChanged(_) => Topic::UserSettings,
            StoreEvent::AppSettingsChanged(_) => Topic::AppSettings,
            StoreEvent::UserProfileChanged(_) => Topic::UserProfile,
            StoreEvent::Cleared => Topic::Cleared,
        }
    }
}

type Callback = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

struct Subscriber {
    id: u64,
    topic: Topic,
    callback: Callback,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl BusInner {
    fn subscribers(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: u64) -> bool {
        let mut subscribers = self.subscribers();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }
}

/// In-process event bus owned by a `DataStore`
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every event on `topic`
    ///
    /// The subscription stays active until `Subscription::unsubscribe` is
    /// called; dropping the handle does not remove it.
    pub fn subscribe<F>(&self, topic: Topic, callback: F) -> Subscription
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers().push(Subscriber {
            id,
            topic,
            callback: Arc::new(callback),
        });
        tracing::debug!("Subscribed #{} to {:?}", id, topic);

        Subscription {
            id,
            topic,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every subscriber of its topic
    pub fn publish(&self, event: &StoreEvent) {
        let topic = event.topic();
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self
            .inner
            .subscribers()
            .iter()
            .filter(|s| s.topic == topic)
            .map(|s| Arc::clone(&s.callback))
            .collect();

        tracing::debug!("Publishing {:?} to {} subscriber(s)", topic, callbacks.len());
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of active subscriptions on `topic`
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner.subscribers().iter().filter(|s| s.topic == topic).count()
    }
}

/// Handle returned by `EventBus::subscribe`
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    topic: Topic,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Stop receiving events. Returns false if the bus is gone or the
    /// subscription was already removed.
    pub fn unsubscribe(self) -> bool {
        match self.bus.upgrade() {
            Some(inner) => inner.remove(self.id),
            None => false,
        }
    }
}

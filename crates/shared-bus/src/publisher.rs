//! Publishing side of the bus

use crate::events::{BlockchainEvent, EventFilter, EventTopic};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Anything that can announce a [`BlockchainEvent`] to other subsystems.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Announce `event`; returns how many receivers it reached.
    async fn publish(&self, event: BlockchainEvent) -> usize;

    /// Events handed to the bus so far, delivered or not.
    fn events_published(&self) -> u64;
}

/// Counters shared between the bus and its subscriptions.
#[derive(Debug, Default)]
pub(crate) struct BusStats {
    pub(crate) published: AtomicU64,
    pub(crate) lagged: AtomicU64,
    /// Live subscriptions per filtered topic; `All` counts unfiltered ones.
    pub(crate) per_topic: Mutex<HashMap<EventTopic, usize>>,
}

impl BusStats {
    pub(crate) fn track(&self, topics: &[EventTopic], delta: isize) {
        let mut per_topic = self.per_topic.lock();
        let keys: &[EventTopic] = if topics.is_empty() {
            &[EventTopic::All]
        } else {
            topics
        };
        for topic in keys {
            let slot = per_topic.entry(*topic).or_insert(0);
            *slot = slot.saturating_add_signed(delta);
            if *slot == 0 {
                per_topic.remove(topic);
            }
        }
    }
}

/// Single-node bus over a `tokio::sync::broadcast` channel.
///
/// Every subscription gets every event; topic filtering happens on the
/// receiving side.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BlockchainEvent>,
    stats: Arc<BusStats>,
    capacity: usize,
}

impl InMemoryEventBus {
    /// Bus with [`DEFAULT_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Bus buffering up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            stats: Arc::new(BusStats::default()),
            capacity,
        }
    }

    /// Start receiving events that match `filter`.
    ///
    /// Events published before this call are not replayed.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        self.stats.track(&filter.topics, 1);
        debug!(topics = ?filter.topics, "Subscribed to event bus");
        Subscription::new(self.sender.subscribe(), filter, Arc::clone(&self.stats))
    }

    /// Synchronous publish.
    ///
    /// A broadcast send never waits, so chain store writes and pool inserts
    /// call this from plain functions.
    pub fn emit(&self, event: BlockchainEvent) -> usize {
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic();
        let receivers = self.sender.send(event).unwrap_or(0);
        trace!(?topic, receivers, "Event emitted");
        receivers
    }

    /// Live subscriptions, filtered or not.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live subscriptions whose filter names `topic`.
    #[must_use]
    pub fn subscribers_for(&self, topic: EventTopic) -> usize {
        self.stats.per_topic.lock().get(&topic).copied().unwrap_or(0)
    }

    /// Events skipped by subscribers that fell more than `capacity` behind.
    #[must_use]
    pub fn lagged_events(&self) -> u64 {
        self.stats.lagged.load(Ordering::Relaxed)
    }

    /// Per-subscriber buffer size
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BlockchainEvent) -> usize {
        self.emit(event)
    }

    fn events_published(&self) -> u64 {
        self.stats.published.load(Ordering::Relaxed)
    }
}

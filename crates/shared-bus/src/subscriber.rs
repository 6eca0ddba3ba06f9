//! Receiving side of the bus

use crate::events::{BlockchainEvent, EventFilter};
use crate::publisher::BusStats;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// Why a subscription can no longer deliver events
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Every sender is gone
    #[error("Event bus closed")]
    Closed,
}

/// Filtered view of the bus. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<BlockchainEvent>,
    filter: EventFilter,
    stats: Arc<BusStats>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<BlockchainEvent>,
        filter: EventFilter,
        stats: Arc<BusStats>,
    ) -> Self {
        Self {
            receiver,
            filter,
            stats,
        }
    }

    /// Wait for the next matching event; `None` once the bus is gone.
    ///
    /// Cancel-safe, so it can be polled from a `tokio::select!` arm. A
    /// subscriber that falls behind skips the overwritten events and
    /// carries on with the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<BlockchainEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<BlockchainEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    fn lagged(&self, skipped: u64) {
        self.stats.lagged.fetch_add(skipped, Ordering::Relaxed);
        warn!(skipped, topics = ?self.filter.topics, "Subscriber fell behind the event bus");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stats.track(&self.filter.topics, -1);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

//! # Blockchain Events
//!
//! Defines the event types that flow through the shared bus between the
//! chain store, the transaction source and the block production pipeline.

use serde::{Deserialize, Serialize};
use shared_types::entities::{Block, Hash, Header};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BlockchainEvent {
    // =========================================================================
    // CHAIN STORE
    // =========================================================================
    /// The canonical head advanced.
    /// Source: chain store | Target: block production scheduler
    ChainHead {
        /// Header of the new head block.
        header: Header,
        /// Hash of the new head block.
        hash: Hash,
    },

    // =========================================================================
    // TRANSACTION SOURCE
    // =========================================================================
    /// New transactions entered the pending pool.
    /// Source: transaction pool | Target: block production scheduler
    NewTransactions {
        /// Hashes of the arrived transactions.
        hashes: Vec<Hash>,
    },

    // =========================================================================
    // SUBSYSTEM 17: BLOCK PRODUCTION
    // =========================================================================
    /// A locally sealed block was written to the chain.
    /// Source: Subsystem 17 | Target: propagation, RPC
    NewMinedBlock(Block),
}

impl BlockchainEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::ChainHead { .. } => EventTopic::Chain,
            Self::NewTransactions { .. } => EventTopic::Mempool,
            Self::NewMinedBlock(_) => EventTopic::BlockProduction,
        }
    }

    /// Get the originating subsystem ID.
    #[must_use]
    pub fn source_subsystem(&self) -> u8 {
        match self {
            Self::ChainHead { .. } => 2,
            Self::NewTransactions { .. } => 6,
            Self::NewMinedBlock(_) => 17,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Canonical chain updates.
    Chain,
    /// Transaction pool updates.
    Mempool,
    /// Subsystem 17 events (Block Production).
    BlockProduction,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source subsystems to include. Empty means all sources.
    pub source_subsystems: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_subsystems: Vec::new(),
        }
    }

    /// Create a filter for events from specific subsystems.
    #[must_use]
    pub fn from_subsystems(subsystems: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_subsystems: subsystems,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BlockchainEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_subsystems.is_empty()
            || self.source_subsystems.contains(&event.source_subsystem());

        topic_match && source_match
    }
}

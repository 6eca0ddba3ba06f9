//! In-memory transaction pool

use crate::ports::TransactionSource;
use parking_lot::RwLock;
use shared_bus::{BlockchainEvent, EventFilter, EventTopic, InMemoryEventBus, Subscription};
use shared_types::{Block, Hash, Transaction};
use std::collections::HashSet;
use std::sync::Arc;

/// Pending transactions kept in arrival order.
///
/// Validation happens before transactions reach the pool.
pub struct InMemoryTxPool {
    pending: RwLock<Vec<Transaction>>,
    bus: Arc<InMemoryEventBus>,
}

impl InMemoryTxPool {
    /// Create an empty pool announcing on `bus`
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self {
            pending: RwLock::new(Vec::new()),
            bus,
        }
    }

    /// Append transactions not already pending and announce them.
    ///
    /// Returns the number of transactions added.
    pub fn add_transactions(&self, transactions: Vec<Transaction>) -> usize {
        let hashes: Vec<Hash> = {
            let mut pending = self.pending.write();
            let mut known: HashSet<Hash> = pending.iter().map(Transaction::hash).collect();
            let mut added = Vec::new();
            for tx in transactions {
                let hash = tx.hash();
                if known.insert(hash) {
                    pending.push(tx);
                    added.push(hash);
                }
            }
            added
        };

        let count = hashes.len();
        if count > 0 {
            self.bus.emit(BlockchainEvent::NewTransactions { hashes });
        }
        count
    }

    /// Drop every pending transaction included in `block`
    pub fn remove_included(&self, block: &Block) -> usize {
        let included: HashSet<Hash> = block.transactions.iter().map(Transaction::hash).collect();
        let mut pending = self.pending.write();
        let before = pending.len();
        pending.retain(|tx| !included.contains(&tx.hash()));
        before - pending.len()
    }

    /// Number of pending transactions
    pub fn len(&self) -> usize {
        self.pending.read().len()
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> bool {
        self.pending.read().is_empty()
    }
}

impl TransactionSource for InMemoryTxPool {
    fn pending_transactions(&self) -> Vec<Transaction> {
        self.pending.read().clone()
    }

    fn subscribe_new_transactions(&self) -> Subscription {
        self.bus.subscribe(EventFilter::topics(vec![EventTopic::Mempool]))
    }
}

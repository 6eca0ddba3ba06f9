//! Pending sealing tasks keyed by seal hash

use super::entities::SealingTask;
use parking_lot::RwLock;
use shared_types::Hash;
use std::collections::HashMap;
use std::sync::Arc;

/// Tasks handed to the consensus engine and awaiting a sealed result.
///
/// Written by the dispatcher, read and pruned by the committer, pruned by
/// the scheduler when the chain head advances.
pub struct PendingTaskStore<S> {
    tasks: RwLock<HashMap<Hash, Arc<SealingTask<S>>>>,
    stale_threshold: u64,
}

impl<S> PendingTaskStore<S> {
    /// Create an empty store with the given staleness depth
    pub fn new(stale_threshold: u64) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            stale_threshold,
        }
    }

    /// Record a task under its seal hash.
    ///
    /// An existing entry with the same seal hash is kept.
    pub fn insert(&self, seal_hash: Hash, task: Arc<SealingTask<S>>) {
        self.tasks.write().entry(seal_hash).or_insert(task);
    }

    /// Look up a task by seal hash
    pub fn get(&self, seal_hash: &Hash) -> Option<Arc<SealingTask<S>>> {
        self.tasks.read().get(seal_hash).cloned()
    }

    /// Remove a task, returning it if present
    pub fn remove(&self, seal_hash: &Hash) -> Option<Arc<SealingTask<S>>> {
        self.tasks.write().remove(seal_hash)
    }

    /// Drop every task whose block number + threshold <= `head`.
    ///
    /// Returns the number of evicted tasks.
    pub fn clear_stale(&self, head: u64) -> usize {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        let threshold = self.stale_threshold;
        tasks.retain(|_, task| task.number().saturating_add(threshold) > head);
        before - tasks.len()
    }

    /// Whether a task is recorded under `seal_hash`
    pub fn contains(&self, seal_hash: &Hash) -> bool {
        self.tasks.read().contains_key(seal_hash)
    }

    /// Number of recorded tasks
    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    /// True when no task is recorded
    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

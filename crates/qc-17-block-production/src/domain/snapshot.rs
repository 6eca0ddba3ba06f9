//! Latest candidate block and state, exposed to readers outside the pipeline

use crate::ports::ExecutionState;
use parking_lot::RwLock;
use shared_types::Block;

/// Read-mostly view of the most recent candidate.
///
/// Block and state are stored as one pair behind a single lock so a reader
/// never sees a block next to another build's state.
pub struct PendingSnapshot<S> {
    inner: RwLock<Option<(Block, S)>>,
}

impl<S: ExecutionState> PendingSnapshot<S> {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Replace the pair.
    ///
    /// The caller hands over its own copy of the state.
    pub fn update(&self, block: Block, state: S) {
        *self.inner.write() = Some((block, state));
    }

    /// Candidate block plus an independent copy of its state.
    ///
    /// Copying costs whatever [`ExecutionState::copy`] costs and happens under
    /// the read lock.
    pub fn pending(&self) -> Option<(Block, S)> {
        self.inner
            .read()
            .as_ref()
            .map(|(block, state)| (block.clone(), state.copy()))
    }

    /// Candidate block only
    pub fn pending_block(&self) -> Option<Block> {
        self.inner.read().as_ref().map(|(block, _)| block.clone())
    }
}

impl<S: ExecutionState> Default for PendingSnapshot<S> {
    fn default() -> Self {
        Self::new()
    }
}

//! The four long-lived pipeline tasks and the state they share.
//!
//! ```text
//! ChainHead / start / recommit ──► WorkScheduler ──BuildRequest──► BlockAssembler
//!                                                                      │
//!                                              PendingSnapshot ◄───────┤ SealingTask
//!                                                                      ▼
//!        chain store ◄── ResultCommitter ◄──sealed block── engine ◄── SealingDispatcher
//! ```
//!
//! Tasks talk over channels only. The settings, the pending task store and
//! the snapshot each sit behind their own lock and are never locked together.

mod assembler;
mod committer;
mod dispatcher;
mod scheduler;
#[cfg(test)]
pub(crate) mod testing;

pub(crate) use assembler::BlockAssembler;
pub(crate) use committer::ResultCommitter;
pub use committer::CommitOutcome;
pub(crate) use dispatcher::SealingDispatcher;
pub use dispatcher::DispatchOutcome;
pub(crate) use scheduler::WorkScheduler;

use crate::domain::{PendingSnapshot, PendingTaskStore, SealingTask, WorkerSettings};
use crate::metrics::MetricsSink;
use crate::ports::{BlockExecutor, ChainStore, ConsensusEngine, ExecutionState, TransactionSource};
use parking_lot::RwLock;
use primitive_types::U256;
use shared_bus::EventPublisher;
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Observer called with a sealing task
pub type TaskHook<S> = Arc<dyn Fn(&SealingTask<S>) + Send + Sync>;

/// Veto called before a task is recorded and sealed
pub type SkipSealHook<S> = Arc<dyn Fn(&SealingTask<S>) -> bool + Send + Sync>;

/// Optional test/observability hooks
pub struct PipelineHooks<S> {
    /// Every task the dispatcher receives, before deduplication
    pub new_task: Option<TaskHook<S>>,

    /// Returning true drops the task without sealing it
    pub skip_seal: Option<SkipSealHook<S>>,

    /// Every task the assembler publishes
    pub full_task: Option<TaskHook<S>>,
}

impl<S> Default for PipelineHooks<S> {
    fn default() -> Self {
        Self {
            new_task: None,
            skip_seal: None,
            full_task: None,
        }
    }
}

impl<S> Clone for PipelineHooks<S> {
    fn clone(&self) -> Self {
        Self {
            new_task: self.new_task.clone(),
            skip_seal: self.skip_seal.clone(),
            full_task: self.full_task.clone(),
        }
    }
}

/// State shared by the pipeline tasks and the producer handle
pub(crate) struct PipelineContext<S: ExecutionState> {
    pub chain: Arc<dyn ChainStore<S>>,
    pub tx_source: Arc<dyn TransactionSource>,
    pub engine: Arc<dyn ConsensusEngine<S>>,
    pub executor: Arc<dyn BlockExecutor<S>>,
    pub events: Arc<dyn EventPublisher>,
    pub metrics: Arc<dyn MetricsSink>,
    pub hooks: PipelineHooks<S>,

    pub settings: RwLock<WorkerSettings>,
    pub pending: PendingTaskStore<S>,
    pub snapshot: PendingSnapshot<S>,

    pub running: AtomicBool,
    pub new_txs: AtomicU64,

    pub gas_limit: u64,
    pub min_gas_price: U256,
}

/// Wall-clock seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

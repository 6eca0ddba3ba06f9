//! # Quantum Chain - Block Production Pipeline (Subsystem 17)
//!
//! **Bounded Context:** Block Production & Sealing
//! **Architecture Compliance:** DDD + Hexagonal + EDA + TDD
//!
//! ## Purpose
//!
//! Continuously assembles candidate blocks, hands them to a pluggable
//! consensus engine for sealing and commits sealed blocks back into the
//! chain store, while new chain heads, new transactions and shutdown keep
//! interrupting the work in flight.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐ BuildRequest ┌──────────────┐ SealingTask ┌──────────────┐
//! │ WorkScheduler│─────────────►│BlockAssembler│────────────►│  Dispatcher  │
//! └──────────────┘              └──────┬───────┘             └──────┬───────┘
//!        ▲ ChainHead / start / timer   │ PendingSnapshot            │ seal()
//!        │                             ▼                            ▼
//!   chain store ◄──────────── ResultCommitter ◄──── sealed block ── engine
//! ```
//!
//! Four long-lived tasks talk over channels. The worker settings, the
//! pending task store and the pending snapshot each have their own lock.
//!
//! ## Critical Invariants
//!
//! 1. **One live build**: a new build request supersedes the token of its predecessor
//! 2. **One seal in flight**: a new task cancels the previous seal first
//! 3. **Exactly-once commit**: results already in the chain or without a
//!    pending task are dropped
//! 4. **Staleness**: pending tasks `stale_threshold` blocks behind the head are evicted
//! 5. **Consistent snapshot**: block and state are replaced together
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! let producer = BlockProducer::builder(MinerConfig::default())
//!     .with_chain_store(chain)
//!     .with_tx_source(pool)
//!     .with_engine(Arc::new(InstantSealEngine::new()))
//!     .with_executor(Arc::new(ReferenceExecutor::new()))
//!     .with_event_bus(bus)
//!     .build()?;
//! producer.start().await?;
//! ```
//!
//! ## Module Structure
//!
//! - [`domain`]: interrupt tokens, pending tasks, snapshot, selection, receipts
//! - [`ports`]: inbound service and outbound collaborator traits
//! - [`pipeline`]: scheduler, assembler, dispatcher and committer tasks
//! - [`service`]: builder and lifecycle controller
//! - [`adapters`]: in-memory chain store, pool, state, executor and engine
//! - [`bridge`]: system contract calls

#![warn(missing_docs)]
#![warn(clippy::all)]

/// In-memory reference adapters
pub mod adapters;
/// System contract calls
pub mod bridge;
/// Domain models and pure logic
pub mod domain;
/// Scheduler, assembler, dispatcher and committer tasks
pub mod pipeline;
/// Inbound service and outbound collaborator traits
pub mod ports;
/// Builder and lifecycle controller
pub mod service;

mod config;
mod error;
mod metrics;

pub use config::{MinerConfig, MAX_EXTRA_DATA_SIZE, MIN_RECOMMIT_INTERVAL_MS};
pub use error::{
    ContractCallError, ExecutionError, MinerError, Result, SealError, StoreError,
};
pub use metrics::{Metrics, MetricsSink, NoopMetrics};

pub use domain::{
    BuildRequest, InterruptReason, InterruptToken, PendingSnapshot, PendingTaskStore,
    SealingTask, TransactionSelector, WorkerSettings,
};

pub use pipeline::{CommitOutcome, DispatchOutcome, PipelineHooks, SkipSealHook, TaskHook};

pub use ports::{
    BlockExecutor, BlockProcessors, BlockProducerService, BuildContext, BuildOutcome,
    ChainStore, ConsensusEngine, ExecutionState, ProcessedBlock, TransactionSource,
    VotingEngine,
};

pub use service::{BlockProducer, BlockProducerBuilder};

/// Subsystem identifier for IPC communication
pub const SUBSYSTEM_ID: u8 = 17;

/// Default block gas limit (20 million gas)
pub const DEFAULT_GAS_LIMIT: u64 = 20_000_000;

/// Default minimum gas price (1 gwei)
pub const DEFAULT_MIN_GAS_PRICE: u64 = 1_000_000_000;

/// Blocks a pending task may lag behind the head before eviction
pub const STALE_THRESHOLD: u64 = 7;

/// Capacity of the sealed-result channel
pub const RESULT_QUEUE_SIZE: usize = 10;

//! Block producer: builds the pipeline and drives its lifecycle
//!
//! [`BlockProducerBuilder`] wires the collaborators into a shared context and
//! spawns the four pipeline tasks. [`BlockProducer`] is the handle the node
//! holds: it flips the running flag, triggers work, forwards lifecycle calls
//! to voting engines and exposes the pending snapshot.

use crate::config::{MinerConfig, MAX_EXTRA_DATA_SIZE};
use crate::domain::{PendingSnapshot, PendingTaskStore, WorkerSettings};
use crate::error::{MinerError, Result};
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::pipeline::{
    BlockAssembler, PipelineContext, PipelineHooks, ResultCommitter, SealingDispatcher,
    WorkScheduler,
};
use crate::ports::{
    BlockExecutor, BlockProcessors, BlockProducerService, ChainStore, ConsensusEngine,
    ExecutionState, TransactionSource,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::EventPublisher;
use shared_types::{Address, Block, Hash, Receipt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// =============================================================================
// BUILDER
// =============================================================================

/// Collects the collaborators of a [`BlockProducer`]
pub struct BlockProducerBuilder<S: ExecutionState> {
    config: MinerConfig,
    chain: Option<Arc<dyn ChainStore<S>>>,
    tx_source: Option<Arc<dyn TransactionSource>>,
    engine: Option<Arc<dyn ConsensusEngine<S>>>,
    executor: Option<Arc<dyn BlockExecutor<S>>>,
    events: Option<Arc<dyn EventPublisher>>,
    metrics: Arc<dyn MetricsSink>,
    hooks: PipelineHooks<S>,
}

impl<S: ExecutionState> BlockProducerBuilder<S> {
    /// Builder over `config` with no collaborators set
    pub fn new(config: MinerConfig) -> Self {
        Self {
            config,
            chain: None,
            tx_source: None,
            engine: None,
            executor: None,
            events: None,
            metrics: Arc::new(NoopMetrics),
            hooks: PipelineHooks::default(),
        }
    }

    /// Chain store providing heads, parent state and block writes
    pub fn with_chain_store(mut self, chain: Arc<dyn ChainStore<S>>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Source of pending transactions
    pub fn with_tx_source(mut self, source: Arc<dyn TransactionSource>) -> Self {
        self.tx_source = Some(source);
        self
    }

    /// Consensus engine sealing candidates
    pub fn with_engine(mut self, engine: Arc<dyn ConsensusEngine<S>>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Executor building candidates and replaying blocks
    pub fn with_executor(mut self, executor: Arc<dyn BlockExecutor<S>>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Bus receiving `NewMinedBlock` announcements
    pub fn with_event_bus(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Metrics sink (defaults to [`NoopMetrics`])
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Test/observability hooks (none by default)
    pub fn with_hooks(mut self, hooks: PipelineHooks<S>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Validate the configuration and spawn the pipeline tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(self) -> Result<BlockProducer<S>> {
        self.config.validate()?;

        let chain = self.chain.ok_or(MinerError::MissingBackend("chain store"))?;
        let tx_source = self
            .tx_source
            .ok_or(MinerError::MissingBackend("transaction source"))?;
        let engine = self
            .engine
            .ok_or(MinerError::MissingBackend("consensus engine"))?;
        let executor = self
            .executor
            .ok_or(MinerError::MissingBackend("block executor"))?;
        let events = self.events.ok_or(MinerError::MissingBackend("event bus"))?;

        let config = self.config;
        let ctx = Arc::new(PipelineContext {
            chain,
            tx_source,
            engine,
            executor,
            events,
            metrics: self.metrics,
            hooks: self.hooks,
            settings: RwLock::new(WorkerSettings::from(&config)),
            pending: PendingTaskStore::new(config.stale_threshold),
            snapshot: PendingSnapshot::new(),
            running: AtomicBool::new(false),
            new_txs: AtomicU64::new(0),
            gas_limit: config.gas_limit,
            min_gas_price: config.min_gas_price,
        });

        let shutdown = CancellationToken::new();
        let (start_tx, start_rx) = mpsc::channel(1);
        let (build_tx, build_rx) = mpsc::channel(1);
        let (task_tx, task_rx) = mpsc::channel(1);
        let (result_tx, result_rx) = mpsc::channel(config.result_queue_size);

        let handles = vec![
            tokio::spawn(
                WorkScheduler::new(
                    Arc::clone(&ctx),
                    start_rx,
                    build_tx,
                    config.recommit_interval(),
                    shutdown.clone(),
                )
                .run(),
            ),
            tokio::spawn(
                BlockAssembler::new(Arc::clone(&ctx), build_rx, task_tx, shutdown.clone()).run(),
            ),
            tokio::spawn(
                SealingDispatcher::new(Arc::clone(&ctx), task_rx, result_tx, shutdown.clone())
                    .run(),
            ),
            tokio::spawn(ResultCommitter::new(Arc::clone(&ctx), result_rx, shutdown.clone()).run()),
        ];

        info!(
            gas_limit = config.gas_limit,
            allow_empty = config.allow_empty_blocks,
            recommit_ms = ?config.recommit_interval_ms,
            "[qc-17] Block producer initialized"
        );

        if config.init {
            // Capacity 1 and nobody has sent yet
            let _ = start_tx.try_send(());
        }

        Ok(BlockProducer {
            ctx,
            start_tx,
            shutdown,
            handles: Mutex::new(handles),
            closed: AtomicBool::new(false),
        })
    }
}

// =============================================================================
// PRODUCER
// =============================================================================

/// Handle to a running sealing pipeline
pub struct BlockProducer<S: ExecutionState> {
    ctx: Arc<PipelineContext<S>>,
    start_tx: mpsc::Sender<()>,
    shutdown: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<S: ExecutionState> BlockProducer<S> {
    /// Shorthand for [`BlockProducerBuilder::new`]
    pub fn builder(config: MinerConfig) -> BlockProducerBuilder<S> {
        BlockProducerBuilder::new(config)
    }

    /// Tasks recorded and awaiting a sealing result
    pub fn pending_task_count(&self) -> usize {
        self.ctx.pending.len()
    }

    /// Current worker settings
    pub fn settings(&self) -> WorkerSettings {
        self.ctx.settings.read().clone()
    }

    /// True once [`close`](BlockProducerService::close) has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn block_processors(&self) -> BlockProcessors<S> {
        let chain = Arc::clone(&self.ctx.chain);
        let processor = Arc::clone(&self.ctx.executor);
        let validator = Arc::clone(&self.ctx.executor);

        BlockProcessors {
            has_bad_block: Arc::new(move |hash: &Hash| chain.has_bad_block(hash)),
            process: Arc::new(move |block: &Block, state: S| processor.process(block, state)),
            validate_state: Arc::new(
                move |block: &Block, state: &S, receipts: &[Receipt], used_gas: u64| {
                    validator.validate_state(block, state, receipts, used_gas)
                },
            ),
        }
    }
}

#[async_trait]
impl<S: ExecutionState> BlockProducerService for BlockProducer<S> {
    type State = S;

    async fn start(&self) -> Result<()> {
        if self.is_closed() {
            return Err(MinerError::Closed);
        }
        self.ctx.running.store(true, Ordering::SeqCst);

        match self.start_tx.try_send(()) {
            // A start signal is already queued
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => return Err(MinerError::Closed),
        }

        if let Some(voting) = self.ctx.engine.as_voting() {
            voting.set_block_processors(self.block_processors());
            if voting.is_primary() {
                voting.start_validating()?;
                debug!("[qc-17] Voting engine started validating");
            }
        }

        info!("[qc-17] Block production started");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.ctx.running.store(false, Ordering::SeqCst);
        if let Some(voting) = self.ctx.engine.as_voting() {
            voting.stop_validating()?;
        }
        info!("[qc-17] Block production stopped");
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.ctx.running.store(false, Ordering::SeqCst);
        self.shutdown.cancel();

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
        info!("[qc-17] Block producer closed");
    }

    fn is_running(&self) -> bool {
        self.ctx.running.load(Ordering::SeqCst)
    }

    fn pending(&self) -> Option<(Block, S)> {
        self.ctx.snapshot.pending()
    }

    fn pending_block(&self) -> Option<Block> {
        self.ctx.snapshot.pending_block()
    }

    fn set_validator(&self, validator: Address) {
        self.ctx.settings.write().validator = validator;
    }

    fn set_fee_recipient(&self, recipient: Address) {
        self.ctx.settings.write().fee_recipient = recipient;
    }

    fn set_extra(&self, extra: Vec<u8>) -> Result<()> {
        if extra.len() > MAX_EXTRA_DATA_SIZE {
            return Err(MinerError::ExtraDataTooLong {
                len: extra.len(),
                max: MAX_EXTRA_DATA_SIZE,
            });
        }
        self.ctx.settings.write().extra_data = extra;
        Ok(())
    }

    fn set_allow_empty_blocks(&self, allow: bool) {
        self.ctx.settings.write().allow_empty_blocks = allow;
    }
}

impl<S: ExecutionState> Drop for BlockProducer<S> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

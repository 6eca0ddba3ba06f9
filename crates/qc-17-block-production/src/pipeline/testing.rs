//! Shared fixtures for the pipeline unit tests

use super::{PipelineContext, PipelineHooks};
use crate::adapters::{InMemoryChainStore, InMemoryTxPool, MemoryState, ReferenceExecutor};
use crate::config::MinerConfig;
use crate::domain::{InterruptToken, PendingSnapshot, PendingTaskStore, SealingTask, WorkerSettings};
use crate::error::SealError;
use crate::metrics::Metrics;
use crate::ports::{BlockExecutor, BuildContext, ChainStore, ConsensusEngine};
use parking_lot::{Mutex, RwLock};
use primitive_types::U256;
use shared_bus::InMemoryEventBus;
use shared_types::{Address, Block, Hash, Header, Transaction};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub(crate) const FUNDED: Address = [0xA1; 20];
pub(crate) const RECIPIENT: Address = [0xB2; 20];

/// Engine that records calls and never delivers a result
#[derive(Default)]
pub(crate) struct RecordingEngine {
    seals: AtomicUsize,
    new_work: AtomicUsize,
    fail_next: AtomicBool,
    stops: Mutex<Vec<CancellationToken>>,
}

impl RecordingEngine {
    pub fn seal_calls(&self) -> usize {
        self.seals.load(Ordering::SeqCst)
    }

    pub fn new_work_calls(&self) -> usize {
        self.new_work.load(Ordering::SeqCst)
    }

    pub fn stop_tokens(&self) -> Vec<CancellationToken> {
        self.stops.lock().clone()
    }

    pub fn fail_next_seal(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl ConsensusEngine<MemoryState> for RecordingEngine {
    fn seal_hash(&self, header: &Header) -> Hash {
        header.seal_hash()
    }

    fn seal(
        &self,
        _chain: &dyn ChainStore<MemoryState>,
        _block: Block,
        _results: mpsc::Sender<Option<Block>>,
        stop: CancellationToken,
    ) -> Result<(), SealError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SealError::Rejected("scripted failure".into()));
        }
        self.seals.fetch_add(1, Ordering::SeqCst);
        self.stops.lock().push(stop);
        Ok(())
    }

    fn on_new_work(&self) {
        self.new_work.fetch_add(1, Ordering::SeqCst);
    }
}

/// Context over in-memory adapters and a [`RecordingEngine`]
pub(crate) struct Harness {
    pub ctx: Arc<PipelineContext<MemoryState>>,
    pub bus: Arc<InMemoryEventBus>,
    pub chain: Arc<InMemoryChainStore<MemoryState>>,
    pub pool: Arc<InMemoryTxPool>,
    pub engine: Arc<RecordingEngine>,
    pub metrics: Arc<Metrics>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_hooks(PipelineHooks::default())
    }

    pub fn with_hooks(hooks: PipelineHooks<MemoryState>) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let chain = Arc::new(InMemoryChainStore::new(
            Self::funded_state(),
            Arc::clone(&bus),
        ));
        let pool = Arc::new(InMemoryTxPool::new(Arc::clone(&bus)));
        let engine = Arc::new(RecordingEngine::default());
        let metrics = Arc::new(Metrics::new());
        let config = MinerConfig::default();

        let ctx = Arc::new(PipelineContext {
            chain: chain.clone(),
            tx_source: pool.clone(),
            engine: engine.clone(),
            executor: Arc::new(ReferenceExecutor::new()),
            events: bus.clone(),
            metrics: metrics.clone(),
            hooks,
            settings: RwLock::new(WorkerSettings::from(&config)),
            pending: PendingTaskStore::new(config.stale_threshold),
            snapshot: PendingSnapshot::new(),
            running: AtomicBool::new(false),
            new_txs: AtomicU64::new(0),
            gas_limit: config.gas_limit,
            min_gas_price: config.min_gas_price,
        });

        Self {
            ctx,
            bus,
            chain,
            pool,
            engine,
            metrics,
        }
    }

    fn funded_state() -> MemoryState {
        MemoryState::with_balance(FUNDED, U256::from(10u64).pow(U256::from(20)))
    }

    pub fn genesis_state(&self) -> MemoryState {
        Self::funded_state()
    }
}

/// Transfer from the funded genesis account
pub(crate) fn funded_transfer(nonce: u64) -> Transaction {
    Transaction {
        from: FUNDED,
        to: Some(RECIPIENT),
        value: U256::from(1_000),
        nonce,
        gas_price: U256::from(crate::DEFAULT_MIN_GAS_PRICE),
        gas_limit: 21_000,
        data: Vec::new(),
    }
}

/// Empty task on top of genesis, distinguished by `timestamp`
pub(crate) fn task_at(harness: &Harness, number: u64, timestamp: u64) -> Arc<SealingTask<MemoryState>> {
    let header = Header {
        parent_hash: harness.chain.current_header().hash(),
        number,
        timestamp,
        ..Header::default()
    };
    Arc::new(SealingTask::new(
        Block::new(header, vec![]),
        vec![],
        harness.genesis_state(),
    ))
}

/// Block 1 with `transactions` transfers plus a trailing finalization receipt
pub(crate) fn task_with_receipts(harness: &Harness, transactions: u64) -> Arc<SealingTask<MemoryState>> {
    let ctx = BuildContext {
        parent: harness.chain.current_header(),
        timestamp: super::unix_now(),
        coinbase: [0xC0; 20],
        extra_data: Vec::new(),
        gas_limit: crate::DEFAULT_GAS_LIMIT,
        min_gas_price: U256::one(),
        allow_empty: true,
        transactions: (0..transactions).map(funded_transfer).collect(),
    };
    let outcome = ReferenceExecutor::new()
        .with_finalization_log()
        .execute(ctx, harness.genesis_state(), &InterruptToken::new())
        .expect("reference execution");
    assert_eq!(outcome.block.transactions.len() as u64, transactions);

    Arc::new(SealingTask::new(outcome.block, outcome.receipts, outcome.state))
}

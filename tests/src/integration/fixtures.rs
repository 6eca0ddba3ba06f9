//! # Test Fixtures
//!
//! A single-node setup: in-memory chain store, pool and state behind a real
//! `BlockProducer`, plus engines and executors that let a test script what
//! the pipeline sees.

use parking_lot::Mutex;
use primitive_types::U256;
use qc_17_block_production::adapters::{
    InMemoryChainStore, InMemoryTxPool, MemoryState, ReferenceExecutor,
};
use qc_17_block_production::{
    BlockExecutor, BlockProducer, BuildContext, BuildOutcome, ChainStore, ConsensusEngine,
    ExecutionError, InterruptToken, Metrics, MinerConfig, PipelineHooks, ProcessedBlock,
    SealError,
};
use shared_bus::{BlockchainEvent, InMemoryEventBus, Subscription};
use shared_types::{Address, Block, Hash, Header, Receipt, Transaction};
use std::sync::{Arc, Condvar};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const FUNDED: Address = [0xA1; 20];
pub const RECIPIENT: Address = [0xB2; 20];
pub const WAIT: Duration = Duration::from_secs(10);

// =============================================================================
// NODE
// =============================================================================

pub struct Node {
    pub bus: Arc<InMemoryEventBus>,
    pub chain: Arc<InMemoryChainStore<MemoryState>>,
    pub pool: Arc<InMemoryTxPool>,
    pub metrics: Arc<Metrics>,
    pub producer: BlockProducer<MemoryState>,
}

impl Node {
    pub fn new(engine: Arc<dyn ConsensusEngine<MemoryState>>) -> Self {
        Self::with(
            MinerConfig::default(),
            engine,
            Arc::new(ReferenceExecutor::new()),
            PipelineHooks::default(),
        )
    }

    pub fn with(
        config: MinerConfig,
        engine: Arc<dyn ConsensusEngine<MemoryState>>,
        executor: Arc<dyn BlockExecutor<MemoryState>>,
        hooks: PipelineHooks<MemoryState>,
    ) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let genesis = MemoryState::with_balance(FUNDED, U256::from(10u64).pow(U256::from(20)));
        let chain = Arc::new(InMemoryChainStore::new(genesis, Arc::clone(&bus)));
        let pool = Arc::new(InMemoryTxPool::new(Arc::clone(&bus)));
        let metrics = Arc::new(Metrics::new());

        let producer = BlockProducer::builder(config)
            .with_chain_store(chain.clone())
            .with_tx_source(pool.clone())
            .with_engine(engine)
            .with_executor(executor)
            .with_event_bus(bus.clone())
            .with_metrics(metrics.clone())
            .with_hooks(hooks)
            .build()
            .expect("producer builds");

        Self {
            bus,
            chain,
            pool,
            metrics,
            producer,
        }
    }
}

pub fn funded_transfer(nonce: u64) -> Transaction {
    Transaction {
        from: FUNDED,
        to: Some(RECIPIENT),
        value: U256::from(1_000),
        nonce,
        gas_price: U256::from(qc_17_block_production::DEFAULT_MIN_GAS_PRICE),
        gas_limit: 21_000,
        data: Vec::new(),
    }
}

/// Poll `condition` until it holds or [`WAIT`] elapses
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Next `NewMinedBlock` on `mined`
pub async fn next_mined(mined: &mut Subscription) -> Block {
    loop {
        let event = tokio::time::timeout(WAIT, mined.recv())
            .await
            .expect("timed out waiting for a mined block")
            .expect("bus closed");
        if let BlockchainEvent::NewMinedBlock(block) = event {
            return block;
        }
    }
}

// =============================================================================
// ENGINES
// =============================================================================

struct SealRequest {
    block: Block,
    results: mpsc::Sender<Option<Block>>,
    stop: CancellationToken,
}

/// Records every seal request and delivers only what the test tells it to
#[derive(Default)]
pub struct ScriptedEngine {
    requests: Mutex<Vec<SealRequest>>,
}

impl ScriptedEngine {
    pub fn seal_calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn candidate(&self, index: usize) -> Block {
        self.requests.lock()[index].block.clone()
    }

    pub fn stop_token(&self, index: usize) -> CancellationToken {
        self.requests.lock()[index].stop.clone()
    }

    /// Push `result` onto the sealed-result stream
    pub async fn deliver(&self, result: Option<Block>) {
        let results = self
            .requests
            .lock()
            .last()
            .map(|r| r.results.clone())
            .expect("no seal request yet");
        results.send(result).await.expect("committer alive");
    }
}

impl ConsensusEngine<MemoryState> for ScriptedEngine {
    fn seal_hash(&self, header: &Header) -> Hash {
        header.seal_hash()
    }

    fn seal(
        &self,
        _chain: &dyn ChainStore<MemoryState>,
        block: Block,
        results: mpsc::Sender<Option<Block>>,
        stop: CancellationToken,
    ) -> Result<(), SealError> {
        self.requests.lock().push(SealRequest {
            block,
            results,
            stop,
        });
        Ok(())
    }
}

// =============================================================================
// EXECUTORS
// =============================================================================

/// Reference executor with a fixed build clock, so every block is stamped
/// `max(timestamp, parent + 1)` and rebuilding on the same head yields the
/// same seal hash
#[derive(Default)]
pub struct PinnedClockExecutor {
    inner: ReferenceExecutor,
    timestamp: u64,
}

impl PinnedClockExecutor {
    pub fn at(timestamp: u64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}

impl BlockExecutor<MemoryState> for PinnedClockExecutor {
    fn execute(
        &self,
        mut ctx: BuildContext,
        parent_state: MemoryState,
        interrupt: &InterruptToken,
    ) -> Result<BuildOutcome<MemoryState>, ExecutionError> {
        ctx.timestamp = self.timestamp;
        self.inner.execute(ctx, parent_state, interrupt)
    }

    fn process(
        &self,
        block: &Block,
        state: MemoryState,
    ) -> Result<ProcessedBlock<MemoryState>, ExecutionError> {
        self.inner.process(block, state)
    }

    fn validate_state(
        &self,
        block: &Block,
        state: &MemoryState,
        receipts: &[Receipt],
        used_gas: u64,
    ) -> Result<(), ExecutionError> {
        self.inner.validate_state(block, state, receipts, used_gas)
    }
}

/// Reference executor whose first build blocks until [`open`](Self::open)
#[derive(Default)]
pub struct GatedExecutor {
    inner: ReferenceExecutor,
    tokens: Mutex<Vec<InterruptToken>>,
    open: std::sync::Mutex<bool>,
    opened: Condvar,
}

impl GatedExecutor {
    pub fn tokens(&self) -> Vec<InterruptToken> {
        self.tokens.lock().clone()
    }

    pub fn open(&self) {
        *self.open.lock().expect("gate lock") = true;
        self.opened.notify_all();
    }
}

impl BlockExecutor<MemoryState> for GatedExecutor {
    fn execute(
        &self,
        ctx: BuildContext,
        parent_state: MemoryState,
        interrupt: &InterruptToken,
    ) -> Result<BuildOutcome<MemoryState>, ExecutionError> {
        let first = {
            let mut tokens = self.tokens.lock();
            tokens.push(interrupt.clone());
            tokens.len() == 1
        };
        if first {
            let mut open = self.open.lock().expect("gate lock");
            while !*open {
                open = self.opened.wait(open).expect("gate lock");
            }
        }
        self.inner.execute(ctx, parent_state, interrupt)
    }

    fn process(
        &self,
        block: &Block,
        state: MemoryState,
    ) -> Result<ProcessedBlock<MemoryState>, ExecutionError> {
        self.inner.process(block, state)
    }

    fn validate_state(
        &self,
        block: &Block,
        state: &MemoryState,
        receipts: &[Receipt],
        used_gas: u64,
    ) -> Result<(), ExecutionError> {
        self.inner.validate_state(block, state, receipts, used_gas)
    }
}

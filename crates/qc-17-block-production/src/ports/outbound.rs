//! Outbound ports (driven side - SPI)
//!
//! Collaborators the pipeline consumes: chain store, transaction source,
//! block executor and consensus engine.

use crate::domain::InterruptToken;
use crate::error::{ExecutionError, SealError, StoreError};
use primitive_types::U256;
use shared_bus::Subscription;
use shared_types::{Address, Block, Hash, Header, Log, Receipt, Transaction};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Execution state produced by applying a block.
pub trait ExecutionState: Send + Sync + 'static {
    /// Independent copy of this state.
    ///
    /// Implementations should make this proportional to the modified-state
    /// delta; callers must not assume it is O(1).
    fn copy(&self) -> Self
    where
        Self: Sized;

    /// Commitment to the full state
    fn root(&self) -> Hash;
}

/// Port: Canonical chain access
pub trait ChainStore<S: ExecutionState>: Send + Sync {
    /// Header of the current head
    fn current_header(&self) -> Header;

    /// Height of the current head
    fn current_height(&self) -> u64 {
        self.current_header().number
    }

    /// Whether the chain holds a block with this hash at this height
    fn has_block(&self, hash: &Hash, number: u64) -> bool;

    /// Copy of the state after block `hash`
    fn state_at(&self, hash: &Hash) -> Option<S>;

    /// Append a block with its receipts, logs and post-state
    fn write_block(
        &self,
        block: &Block,
        receipts: &[Receipt],
        logs: &[Log],
        state: &S,
        update_head: bool,
    ) -> Result<(), StoreError>;

    /// Whether `hash` was recorded as a bad block
    fn has_bad_block(&self, hash: &Hash) -> bool;

    /// Subscribe to head updates
    fn subscribe_chain_head(&self) -> Subscription;
}

/// Port: Pending transactions
pub trait TransactionSource: Send + Sync {
    /// Executable transactions in arrival order
    fn pending_transactions(&self) -> Vec<Transaction>;

    /// Subscribe to new-transaction notifications
    fn subscribe_new_transactions(&self) -> Subscription;
}

/// Everything an executor needs to build one candidate
#[derive(Clone, Debug)]
pub struct BuildContext {
    /// Head the candidate extends
    pub parent: Header,

    /// Requested timestamp (seconds)
    pub timestamp: u64,

    /// Header coinbase
    pub coinbase: Address,

    /// Header extra data
    pub extra_data: Vec<u8>,

    /// Block gas limit
    pub gas_limit: u64,

    /// Minimum gas price
    pub min_gas_price: U256,

    /// Whether an empty candidate may be sealed
    pub allow_empty: bool,

    /// Candidate transactions in arrival order
    pub transactions: Vec<Transaction>,
}

/// Candidate produced by an executor
#[derive(Debug)]
pub struct BuildOutcome<S> {
    /// Unsealed block
    pub block: Block,

    /// Receipts in transaction order
    pub receipts: Vec<Receipt>,

    /// Post-execution state
    pub state: S,

    /// The block is a placeholder that should be shown as pending but not
    /// sealed (empty blocks disallowed and nothing to include)
    pub placeholder: bool,
}

/// Result of replaying an existing block
#[derive(Debug)]
pub struct ProcessedBlock<S> {
    /// Receipts in transaction order
    pub receipts: Vec<Receipt>,

    /// All logs, in receipt order
    pub logs: Vec<Log>,

    /// Gas used by the block
    pub used_gas: u64,

    /// Post-execution state
    pub state: S,
}

/// Port: Transaction execution
///
/// Called from a blocking thread; implementations may take as long as they
/// need but must poll `interrupt` between transactions.
pub trait BlockExecutor<S: ExecutionState>: Send + Sync {
    /// Select, execute and assemble a candidate on top of `parent_state`
    fn execute(
        &self,
        ctx: BuildContext,
        parent_state: S,
        interrupt: &InterruptToken,
    ) -> Result<BuildOutcome<S>, ExecutionError>;

    /// Replay `block` on `state`
    fn process(&self, block: &Block, state: S) -> Result<ProcessedBlock<S>, ExecutionError>;

    /// Check `state` and `receipts` against the commitments in `block`
    fn validate_state(
        &self,
        block: &Block,
        state: &S,
        receipts: &[Receipt],
        used_gas: u64,
    ) -> Result<(), ExecutionError>;
}

/// Bad-block lookup handed to voting engines
pub type HasBadBlockFn = Arc<dyn Fn(&Hash) -> bool + Send + Sync>;

/// Block replay handed to voting engines
pub type ProcessFn<S> =
    Arc<dyn Fn(&Block, S) -> Result<ProcessedBlock<S>, ExecutionError> + Send + Sync>;

/// State validation handed to voting engines
pub type ValidateStateFn<S> =
    Arc<dyn Fn(&Block, &S, &[Receipt], u64) -> Result<(), ExecutionError> + Send + Sync>;

/// Callbacks a voting engine uses to check proposals from other validators
pub struct BlockProcessors<S> {
    /// Whether a block hash is known bad
    pub has_bad_block: HasBadBlockFn,

    /// Replay a proposal
    pub process: ProcessFn<S>,

    /// Validate the replayed state
    pub validate_state: ValidateStateFn<S>,
}

impl<S> Clone for BlockProcessors<S> {
    fn clone(&self) -> Self {
        Self {
            has_bad_block: Arc::clone(&self.has_bad_block),
            process: Arc::clone(&self.process),
            validate_state: Arc::clone(&self.validate_state),
        }
    }
}

/// Port: Consensus engine
pub trait ConsensusEngine<S: ExecutionState>: Send + Sync {
    /// Hash of the header without its seal
    fn seal_hash(&self, header: &Header) -> Hash;

    /// Start sealing `block`.
    ///
    /// Returns immediately. The sealed block is pushed to `results` later,
    /// or never if `stop` is cancelled first.
    fn seal(
        &self,
        chain: &dyn ChainStore<S>,
        block: Block,
        results: mpsc::Sender<Option<Block>>,
        stop: CancellationToken,
    ) -> Result<(), SealError>;

    /// A new round of local block production began
    fn on_new_work(&self) {}

    /// Voting capability, if the engine seals through validator rounds
    fn as_voting(&self) -> Option<&dyn VotingEngine<S>> {
        None
    }
}

/// Extended capability of engines that seal by validator voting
pub trait VotingEngine<S: ExecutionState>: Send + Sync {
    /// Install the callbacks used to check other validators' proposals
    fn set_block_processors(&self, processors: BlockProcessors<S>);

    /// Begin participating in rounds
    fn start_validating(&self) -> Result<(), SealError>;

    /// Stop participating in rounds
    fn stop_validating(&self) -> Result<(), SealError>;

    /// Whether this node is a primary participant
    fn is_primary(&self) -> bool;
}

//! Domain entities for block production

use shared_types::{Address, Block, Receipt};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Instant;

// =============================================================================
// INTERRUPTION
// =============================================================================

/// Why an in-flight build was superseded
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum InterruptReason {
    /// Still live
    None = 0,
    /// A new chain head (or start) replaced the build
    NewHead = 1,
    /// The recommit timer resubmitted work
    Resubmit = 2,
}

impl InterruptReason {
    fn from_code(code: i32) -> Self {
        match code {
            1 => Self::NewHead,
            2 => Self::Resubmit,
            _ => Self::None,
        }
    }
}

/// Cancellation signal owned by a single build request.
///
/// Cloning shares the cell: the scheduler keeps one handle to supersede the
/// build, the assembler and executor poll the other.
#[derive(Clone, Debug, Default)]
pub struct InterruptToken(Arc<AtomicI32>);

impl InterruptToken {
    /// Mint a live token
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the build as superseded
    pub fn supersede(&self, reason: InterruptReason) {
        self.0.store(reason as i32, Ordering::SeqCst);
    }

    /// Current reason; [`InterruptReason::None`] while live
    pub fn reason(&self) -> InterruptReason {
        InterruptReason::from_code(self.0.load(Ordering::SeqCst))
    }

    /// True once [`supersede`](Self::supersede) has been called with a real reason
    pub fn is_superseded(&self) -> bool {
        self.reason() != InterruptReason::None
    }
}

// =============================================================================
// PIPELINE MESSAGES
// =============================================================================

/// Request to assemble a new candidate block
#[derive(Clone, Debug)]
pub struct BuildRequest {
    /// Cancellation signal for this build only
    pub token: InterruptToken,

    /// Whether an empty candidate may be sealed
    pub allow_empty: bool,

    /// Wall-clock seconds at trigger time
    pub timestamp: u64,
}

/// A candidate block waiting for its seal.
///
/// `state` belongs to the task until the block is committed.
#[derive(Debug)]
pub struct SealingTask<S> {
    /// Receipts in transaction order, block location not yet stamped
    pub receipts: Vec<Receipt>,

    /// Post-execution state
    pub state: S,

    /// Unsealed candidate
    pub block: Block,

    /// When the task was created
    pub created_at: Instant,
}

impl<S> SealingTask<S> {
    /// Create a task stamped with the current instant
    pub fn new(block: Block, receipts: Vec<Receipt>, state: S) -> Self {
        Self {
            receipts,
            state,
            block,
            created_at: Instant::now(),
        }
    }

    /// Height of the candidate
    pub fn number(&self) -> u64 {
        self.block.number()
    }
}

// =============================================================================
// WORKER SETTINGS
// =============================================================================

/// Settings mutated through the producer's setters and read at the start of
/// every build
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Address that signs consensus messages
    pub validator: Address,

    /// Header coinbase
    pub fee_recipient: Address,

    /// Header extra data
    pub extra_data: Vec<u8>,

    /// Seal blocks without transactions
    pub allow_empty_blocks: bool,
}

impl From<&crate::config::MinerConfig> for WorkerSettings {
    fn from(config: &crate::config::MinerConfig) -> Self {
        Self {
            validator: config.validator,
            fee_recipient: config.fee_recipient,
            extra_data: config.extra_data.clone(),
            allow_empty_blocks: config.allow_empty_blocks,
        }
    }
}

//! Hexagonal architecture ports

pub mod inbound;
pub mod outbound;

pub use inbound::BlockProducerService;
pub use outbound::{
    BlockExecutor, BlockProcessors, BuildContext, BuildOutcome, ChainStore, ConsensusEngine,
    ExecutionState, HasBadBlockFn, ProcessFn, ProcessedBlock, TransactionSource, ValidateStateFn,
    VotingEngine,
};

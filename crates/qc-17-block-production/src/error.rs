//! Error types for block production subsystem

use crate::domain::InterruptReason;
use shared_types::Hash;
use thiserror::Error;

/// Result type alias for block production operations
pub type Result<T> = std::result::Result<T, MinerError>;

/// Errors surfaced by the block producer
#[derive(Debug, Error)]
pub enum MinerError {
    /// A required collaborator was not supplied to the builder
    #[error("Missing backend: {0}")]
    MissingBackend(&'static str),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Extra data does not fit in the header
    #[error("Extra data too long: {len} bytes, maximum {max}")]
    ExtraDataTooLong {
        /// Supplied length
        len: usize,
        /// Allowed length
        max: usize,
    },

    /// Block construction failed
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Consensus engine refused to seal
    #[error("Seal error: {0}")]
    Seal(#[from] SealError),

    /// Chain store write failed
    #[error("Commit error: {0}")]
    Commit(String),

    /// A sealed block has no matching pending task
    #[error("No pending task for sealed block")]
    UnknownPendingTask,

    /// The producer has been closed and cannot be restarted
    #[error("Block producer closed")]
    Closed,

    /// Contract call through the bridge failed
    #[error("Contract call error: {0}")]
    ContractCall(#[from] ContractCallError),
}

impl MinerError {
    /// Check if error is recoverable (the next sealing round may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Execution(_) | Self::Seal(_) | Self::Commit(_) | Self::UnknownPendingTask
        )
    }

    /// Check if error is critical (the producer cannot operate)
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::MissingBackend(_)
                | Self::InvalidConfig(_)
                | Self::ExtraDataTooLong { .. }
                | Self::Closed
        )
    }
}

/// Errors returned by a block executor
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The build was superseded while executing
    #[error("Interrupted: {0:?}")]
    Interrupted(InterruptReason),

    /// No state is available for the given block
    #[error("State unavailable for block {}", hex::encode(.0))]
    StateUnavailable(Hash),

    /// Execution failed
    #[error("Execution failed: {0}")]
    Failed(String),
}

/// Errors returned by a consensus engine seal call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// The seal was cancelled before it started
    #[error("Seal cancelled")]
    Cancelled,

    /// The engine rejected the candidate
    #[error("Seal rejected: {0}")]
    Rejected(String),

    /// The engine does not support the requested operation
    #[error("Operation not supported by engine")]
    Unsupported,
}

/// Errors returned by a chain store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The block's parent is not in the store
    #[error("Unknown parent {}", hex::encode(.0))]
    UnknownParent(Hash),

    /// The write failed
    #[error("Write failed: {0}")]
    Write(String),
}

/// Errors returned by the contract-call bridge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractCallError {
    /// No chain head/state is available to call against
    #[error("No chain context available")]
    NoChainContext,

    /// The registry contract is not deployed
    #[error("Registry contract not deployed")]
    RegistryNotDeployed,

    /// The requested contract is not registered
    #[error("Contract {} not deployed", hex::encode(.0))]
    ContractNotDeployed([u8; 32]),

    /// The call itself failed
    #[error("Call execution failed: {0}")]
    Execution(String),
}

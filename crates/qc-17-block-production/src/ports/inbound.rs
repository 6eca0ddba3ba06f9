//! Inbound ports (driving side - API)

use crate::error::Result;
use async_trait::async_trait;
use shared_types::{Address, Block};

/// Primary port: Block production service
#[async_trait]
pub trait BlockProducerService: Send + Sync {
    /// Execution state exposed through [`pending`](Self::pending)
    type State: Send;

    /// Begin sealing and submit a first round of work
    async fn start(&self) -> Result<()>;

    /// Stop sealing; builds continue to refresh the pending snapshot
    async fn stop(&self) -> Result<()>;

    /// Stop permanently and wait for the pipeline tasks to exit
    async fn close(&self);

    /// Whether the producer is sealing
    fn is_running(&self) -> bool;

    /// Latest candidate with an independent copy of its state
    fn pending(&self) -> Option<(Block, Self::State)>;

    /// Latest candidate block
    fn pending_block(&self) -> Option<Block>;

    /// Set the validator address
    fn set_validator(&self, validator: Address);

    /// Set the fee recipient (header coinbase)
    fn set_fee_recipient(&self, recipient: Address);

    /// Set the header extra data
    fn set_extra(&self, extra: Vec<u8>) -> Result<()>;

    /// Allow or forbid sealing empty blocks
    fn set_allow_empty_blocks(&self, allow: bool);
}

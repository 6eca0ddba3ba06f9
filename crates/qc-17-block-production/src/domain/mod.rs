//! Domain layer - Pure business logic for block production
//!
//! Nothing here spawns tasks or touches channels; the pipeline loops in
//! [`crate::pipeline`] drive these types.
//!
//! ## Entities
//!
//! - [`InterruptToken`]: Per-build cancellation cell
//! - [`BuildRequest`]: Scheduler to assembler message
//! - [`SealingTask`]: Candidate awaiting its seal
//! - [`WorkerSettings`]: Validator, coinbase, extra data, empty-block policy
//!
//! ## Stores
//!
//! - [`PendingTaskStore`]: Seal hash to task, with staleness eviction
//! - [`PendingSnapshot`]: Latest candidate block/state pair
//!
//! ## Services
//!
//! - [`TransactionSelector`]: Deterministic greedy selection
//! - [`stamp_receipts`], [`total_fees`]: Commit-time receipt handling

mod entities;
mod pending;
mod receipts;
mod selection;
mod snapshot;

pub use entities::*;
pub use pending::PendingTaskStore;
pub use receipts::{format_ether, stamp_receipts, total_fees, total_fees_wei};
pub use selection::TransactionSelector;
pub use snapshot::PendingSnapshot;

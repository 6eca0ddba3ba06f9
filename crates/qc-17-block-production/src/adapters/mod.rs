//! Reference adapters for the outbound ports
//!
//! In-memory chain store, transaction pool and account state, a
//! deterministic executor and a nonce-search sealing engine. Enough to run
//! the pipeline end to end without an external node.

mod chain;
mod engine;
mod executor;
mod pool;
mod state;

pub use chain::InMemoryChainStore;
pub use engine::{InstantSealEngine, MAX_DIFFICULTY_BITS};
pub use executor::{contract_address, intrinsic_gas, ReferenceExecutor, TX_DATA_GAS_PER_BYTE, TX_GAS};
pub use pool::InMemoryTxPool;
pub use state::{Account, MemoryState};

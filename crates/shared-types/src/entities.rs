//! # Core Chain Entities
//!
//! Defines the chain entities exchanged between the block production
//! pipeline, the chain store, the transaction source and consensus engines.
//!
//! ## Clusters
//!
//! - **Chain**: `Header`, `Block`, `Transaction`
//! - **Execution Output**: `Receipt`, `Log`
//!
//! All hashes are SHA-256 over a canonical little-endian byte layout.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// The all-zero hash.
///
/// A log carrying this transaction hash was emitted by block finalization
/// rather than by an individual transaction.
pub const ZERO_HASH: Hash = [0u8; 32];

/// The all-zero address.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// One ether expressed in wei (10^18).
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

fn u256_bytes(value: &U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

/// Digest an ordered list of hashes into a single root.
///
/// Order matters: the same hashes in a different order yield a different root.
pub fn ordered_root<'a, I>(hashes: I) -> Hash
where
    I: IntoIterator<Item = &'a Hash>,
{
    let mut hasher = Sha256::new();
    for (index, hash) in hashes.into_iter().enumerate() {
        hasher.update((index as u64).to_le_bytes());
        hasher.update(hash);
    }
    hasher.finalize().into()
}

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// The header of a block.
///
/// `seal` is the only field filled in by the consensus engine; every other
/// field is fixed once the block has been assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Header {
    /// Hash of the parent block.
    pub parent_hash: Hash,
    /// Block height in the chain.
    pub number: u64,
    /// Unix timestamp (seconds) when the block was assembled.
    pub timestamp: u64,
    /// Recipient of transaction fees.
    pub coinbase: Address,
    /// Root hash of the state after applying this block.
    pub state_root: Hash,
    /// Ordered root of the block's transaction hashes.
    pub transactions_root: Hash,
    /// Ordered root of the block's receipts.
    pub receipts_root: Hash,
    /// Total gas consumed by the block's transactions.
    pub gas_used: u64,
    /// Gas ceiling for this block.
    pub gas_limit: u64,
    /// Free-form extra data (client id, validator metadata).
    pub extra_data: Vec<u8>,
    /// Consensus-specific seal (PoW nonce, aggregated signatures, ...).
    pub seal: Vec<u8>,
}

impl Header {
    fn encode_unsealed(&self, hasher: &mut Sha256) {
        hasher.update(self.parent_hash);
        hasher.update(self.number.to_le_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.coinbase);
        hasher.update(self.state_root);
        hasher.update(self.transactions_root);
        hasher.update(self.receipts_root);
        hasher.update(self.gas_used.to_le_bytes());
        hasher.update(self.gas_limit.to_le_bytes());
        hasher.update((self.extra_data.len() as u64).to_le_bytes());
        hasher.update(&self.extra_data);
    }

    /// Full block hash, seal included.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        self.encode_unsealed(&mut hasher);
        hasher.update((self.seal.len() as u64).to_le_bytes());
        hasher.update(&self.seal);
        hasher.finalize().into()
    }

    /// Hash of the header with the seal field excluded.
    ///
    /// Two blocks sealed differently from the same candidate share this value.
    pub fn seal_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        self.encode_unsealed(&mut hasher);
        hasher.finalize().into()
    }
}

/// A full block: header plus ordered transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// Transactions in execution order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block, deriving the transactions root from `transactions`.
    pub fn new(mut header: Header, transactions: Vec<Transaction>) -> Self {
        let hashes: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        header.transactions_root = ordered_root(&hashes);
        Self {
            header,
            transactions,
        }
    }

    /// Full block hash.
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Block height.
    pub fn number(&self) -> u64 {
        self.header.number
    }

    /// Block timestamp in seconds.
    pub fn time(&self) -> u64 {
        self.header.timestamp
    }

    /// Return a copy of this block carrying `seal`.
    pub fn with_seal(&self, seal: Vec<u8>) -> Self {
        let mut sealed = self.clone();
        sealed.header.seal = seal;
        sealed
    }
}

/// A transfer/call transaction as supplied by the transaction source.
///
/// Signature checks happen before a transaction reaches the pool, so the
/// sender is carried explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Transaction {
    /// Sender address.
    pub from: Address,
    /// Recipient address (None for contract creation).
    pub to: Option<Address>,
    /// Transferred value in wei.
    pub value: U256,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price in wei.
    pub gas_price: U256,
    /// Gas limit for this transaction.
    pub gas_limit: u64,
    /// Call data.
    pub data: Vec<u8>,
}

impl Transaction {
    /// Compute the transaction hash.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.from);
        match &self.to {
            Some(to) => {
                hasher.update([1u8]);
                hasher.update(to);
            }
            None => hasher.update([0u8]),
        }
        hasher.update(u256_bytes(&self.value));
        hasher.update(self.nonce.to_le_bytes());
        hasher.update(u256_bytes(&self.gas_price));
        hasher.update(self.gas_limit.to_le_bytes());
        hasher.update(&self.data);
        hasher.finalize().into()
    }

    /// Maximum cost: value + gas_price * gas_limit.
    ///
    /// `None` when the cost does not fit in 256 bits.
    pub fn total_cost(&self) -> Option<U256> {
        self.gas_price
            .checked_mul(U256::from(self.gas_limit))?
            .checked_add(self.value)
    }
}

// =============================================================================
// CLUSTER B: EXECUTION OUTPUT
// =============================================================================

/// An event emitted during execution.
///
/// Block location fields are zero until the enclosing block has been sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Log {
    /// Emitting account.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<Hash>,
    /// Unindexed payload.
    pub data: Vec<u8>,
    /// Height of the enclosing block.
    pub block_number: u64,
    /// Hash of the originating transaction, zero for finalization logs.
    pub tx_hash: Hash,
    /// Index of the originating transaction in the block.
    pub tx_index: u32,
    /// Hash of the enclosing block.
    pub block_hash: Hash,
    /// Index of the log in the block.
    pub index: u32,
}

/// Execution status of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReceiptStatus {
    /// Execution failed; fees were still charged.
    Failed,
    /// Execution succeeded.
    #[default]
    Success,
}

/// The outcome of executing one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Receipt {
    /// Execution status.
    pub status: ReceiptStatus,
    /// Gas used by the block up to and including this transaction.
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction alone.
    pub gas_used: u64,
    /// Hash of the transaction, zero for a block-finalization receipt.
    pub tx_hash: Hash,
    /// Logs emitted during execution.
    pub logs: Vec<Log>,
    /// Hash of the enclosing block.
    pub block_hash: Hash,
    /// Height of the enclosing block.
    pub block_number: u64,
    /// Position of the transaction in the block.
    pub transaction_index: u32,
}

impl Receipt {
    /// Digest of the consensus-relevant receipt fields.
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update([self.status as u8]);
        hasher.update(self.cumulative_gas_used.to_le_bytes());
        hasher.update(self.tx_hash);
        hasher.update((self.logs.len() as u64).to_le_bytes());
        for log in &self.logs {
            hasher.update(log.address);
            for topic in &log.topics {
                hasher.update(topic);
            }
            hasher.update(&log.data);
        }
        hasher.finalize().into()
    }
}

/// Ordered root over a receipt list.
pub fn receipts_root(receipts: &[Receipt]) -> Hash {
    let hashes: Vec<Hash> = receipts.iter().map(Receipt::hash).collect();
    ordered_root(&hashes)
}

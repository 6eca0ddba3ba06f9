//! Deterministic reference executor over [`MemoryState`]

use super::MemoryState;
use crate::domain::{InterruptToken, TransactionSelector};
use crate::error::ExecutionError;
use crate::ports::{BlockExecutor, BuildContext, BuildOutcome, ExecutionState, ProcessedBlock};
use primitive_types::U256;
use sha2::{Digest, Sha256};
use shared_types::{
    receipts_root, Address, Block, Hash, Header, Log, Receipt, ReceiptStatus, Transaction,
    ZERO_HASH,
};

/// Gas charged for every transaction
pub const TX_GAS: u64 = 21_000;

/// Gas charged per byte of call data
pub const TX_DATA_GAS_PER_BYTE: u64 = 16;

/// Emitter of block-finalization logs
pub const FINALIZATION_ADDRESS: Address = [0xFF; 20];

fn topic(signature: &str) -> Hash {
    Sha256::digest(signature.as_bytes()).into()
}

fn address_topic(address: &Address) -> Hash {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(address);
    out
}

/// Address of a contract created by `sender` at `nonce`
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(sender);
    hasher.update(nonce.to_le_bytes());
    let digest: Hash = hasher.finalize().into();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    out
}

/// Gas a transaction uses under the reference rules
pub fn intrinsic_gas(tx: &Transaction) -> u64 {
    TX_GAS + TX_DATA_GAS_PER_BYTE * tx.data.len() as u64
}

/// Applies value transfers and charges a flat intrinsic gas.
///
/// Selection order comes from [`TransactionSelector`]: gas price descending,
/// arrival ascending, nonce order per sender. A transaction with a wrong
/// nonce, an unaffordable or overflowing cost, or a gas limit below its
/// intrinsic gas is skipped. The interrupt token is polled before each transaction.
#[derive(Debug, Default, Clone)]
pub struct ReferenceExecutor {
    emit_finalization_log: bool,
}

impl ReferenceExecutor {
    /// Executor without finalization receipts
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block-finalization receipt (zero transaction hash) to every block
    pub fn with_finalization_log(mut self) -> Self {
        self.emit_finalization_log = true;
        self
    }
}

struct BlockRun {
    state: MemoryState,
    coinbase: Address,
    number: u64,
    receipts: Vec<Receipt>,
    gas_used: u64,
    log_index: u32,
}

impl BlockRun {
    fn new(state: MemoryState, coinbase: Address, number: u64) -> Self {
        Self {
            state,
            coinbase,
            number,
            receipts: Vec::new(),
            gas_used: 0,
            log_index: 0,
        }
    }

    fn apply(&mut self, tx: &Transaction) -> Option<u64> {
        let gas_used = intrinsic_gas(tx);
        if gas_used > tx.gas_limit || self.state.nonce(&tx.from) != tx.nonce {
            return None;
        }
        // Costs that overflow 256 bits are unaffordable
        if self.state.balance(&tx.from) < tx.total_cost()? {
            return None;
        }

        let fee = tx.gas_price.checked_mul(U256::from(gas_used))?;
        if !self.state.debit(tx.from, tx.value.checked_add(fee)?) {
            return None;
        }
        let recipient = tx.to.unwrap_or_else(|| contract_address(&tx.from, tx.nonce));
        self.state.credit(recipient, tx.value);
        self.state.credit(self.coinbase, fee);
        self.state.bump_nonce(tx.from);
        self.gas_used += gas_used;

        let tx_hash = tx.hash();
        let mut value = [0u8; 32];
        tx.value.to_big_endian(&mut value);
        let log = Log {
            address: recipient,
            topics: vec![topic("Transfer(address,address,uint256)"), address_topic(&tx.from)],
            data: value.to_vec(),
            block_number: self.number,
            tx_hash,
            tx_index: self.receipts.len() as u32,
            index: self.log_index,
            ..Log::default()
        };
        self.log_index += 1;

        self.receipts.push(Receipt {
            status: ReceiptStatus::Success,
            cumulative_gas_used: self.gas_used,
            gas_used,
            tx_hash,
            logs: vec![log],
            ..Receipt::default()
        });
        Some(gas_used)
    }

    fn finalize(&mut self) {
        let log = Log {
            address: FINALIZATION_ADDRESS,
            topics: vec![topic("BlockFinalized(uint64)")],
            data: self.number.to_be_bytes().to_vec(),
            block_number: self.number,
            tx_hash: ZERO_HASH,
            tx_index: self.receipts.len() as u32,
            index: self.log_index,
            ..Log::default()
        };
        self.log_index += 1;
        self.receipts.push(Receipt {
            status: ReceiptStatus::Success,
            cumulative_gas_used: self.gas_used,
            tx_hash: ZERO_HASH,
            logs: vec![log],
            ..Receipt::default()
        });
    }
}

impl BlockExecutor<MemoryState> for ReferenceExecutor {
    fn execute(
        &self,
        ctx: BuildContext,
        parent_state: MemoryState,
        interrupt: &InterruptToken,
    ) -> Result<BuildOutcome<MemoryState>, ExecutionError> {
        let number = ctx.parent.number + 1;
        let timestamp = ctx.timestamp.max(ctx.parent.timestamp + 1);
        let mut run = BlockRun::new(parent_state, ctx.coinbase, number);

        let selector = TransactionSelector::new(ctx.gas_limit, ctx.min_gas_price);
        let selected = selector.select(&ctx.transactions, |tx| {
            if interrupt.is_superseded() {
                return Err(ExecutionError::Interrupted(interrupt.reason()));
            }
            Ok(run.apply(tx))
        })?;
        if self.emit_finalization_log {
            run.finalize();
        }

        let transactions: Vec<Transaction> = selected
            .into_iter()
            .map(|i| ctx.transactions[i].clone())
            .collect();
        let placeholder = transactions.is_empty() && !ctx.allow_empty;

        let header = Header {
            parent_hash: ctx.parent.hash(),
            number,
            timestamp,
            coinbase: ctx.coinbase,
            state_root: run.state.root(),
            receipts_root: receipts_root(&run.receipts),
            gas_used: run.gas_used,
            gas_limit: ctx.gas_limit,
            extra_data: ctx.extra_data,
            ..Header::default()
        };

        Ok(BuildOutcome {
            block: Block::new(header, transactions),
            receipts: run.receipts,
            state: run.state,
            placeholder,
        })
    }

    fn process(
        &self,
        block: &Block,
        state: MemoryState,
    ) -> Result<ProcessedBlock<MemoryState>, ExecutionError> {
        let mut run = BlockRun::new(state, block.header.coinbase, block.number());
        for (index, tx) in block.transactions.iter().enumerate() {
            if run.apply(tx).is_none() {
                return Err(ExecutionError::Failed(format!(
                    "transaction {index} of block {} cannot be applied",
                    block.number()
                )));
            }
        }
        if self.emit_finalization_log {
            run.finalize();
        }

        let logs = run
            .receipts
            .iter()
            .flat_map(|r| r.logs.iter().cloned())
            .collect();
        Ok(ProcessedBlock {
            receipts: run.receipts,
            logs,
            used_gas: run.gas_used,
            state: run.state,
        })
    }

    fn validate_state(
        &self,
        block: &Block,
        state: &MemoryState,
        receipts: &[Receipt],
        used_gas: u64,
    ) -> Result<(), ExecutionError> {
        let header = &block.header;
        if used_gas != header.gas_used {
            return Err(ExecutionError::Failed(format!(
                "invalid gas used (remote: {}, local: {used_gas})",
                header.gas_used
            )));
        }
        if receipts_root(receipts) != header.receipts_root {
            return Err(ExecutionError::Failed("invalid receipts root".into()));
        }
        if state.root() != header.state_root {
            return Err(ExecutionError::Failed("invalid state root".into()));
        }
        Ok(())
    }
}

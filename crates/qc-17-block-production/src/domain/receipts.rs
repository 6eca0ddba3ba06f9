//! Receipt finalization once a block's hash is known

use primitive_types::U256;
use shared_types::{Block, Hash, Log, Receipt, WEI_PER_ETHER, ZERO_HASH};

/// Stamp block location onto copies of `receipts` and collect their logs.
///
/// Each receipt gets the block hash, number and its index. Every log gets the
/// block hash; a log with a zero transaction hash came from block finalization
/// and takes the block hash as its transaction hash.
pub fn stamp_receipts(receipts: &[Receipt], block_hash: Hash, number: u64) -> (Vec<Receipt>, Vec<Log>) {
    let mut stamped = Vec::with_capacity(receipts.len());
    let mut logs = Vec::new();

    for (index, receipt) in receipts.iter().enumerate() {
        let mut receipt = receipt.clone();
        receipt.block_hash = block_hash;
        receipt.block_number = number;
        receipt.transaction_index = index as u32;

        for log in &mut receipt.logs {
            log.block_hash = block_hash;
            log.block_number = number;
            if log.tx_hash == ZERO_HASH {
                log.tx_hash = block_hash;
            }
        }
        logs.extend(receipt.logs.iter().cloned());
        stamped.push(receipt);
    }

    (stamped, logs)
}

/// Total fees paid by the block's transactions, in wei.
///
/// Transactions and receipts must share the same order; a trailing receipt
/// without a transaction (block finalization) pays nothing.
pub fn total_fees_wei(block: &Block, receipts: &[Receipt]) -> U256 {
    block
        .transactions
        .iter()
        .zip(receipts)
        .fold(U256::zero(), |acc, (tx, receipt)| {
            acc.saturating_add(tx.gas_price.saturating_mul(U256::from(receipt.gas_used)))
        })
}

/// Total fees as whole ether and the remaining wei.
pub fn total_fees(block: &Block, receipts: &[Receipt]) -> (U256, U256) {
    let wei = total_fees_wei(block, receipts);
    let ether = U256::from(WEI_PER_ETHER);
    (wei / ether, wei % ether)
}

/// Render a `(whole, fraction)` pair as a decimal ether amount.
pub fn format_ether((whole, fraction): (U256, U256)) -> String {
    format!("{}.{:0>18}", whole, fraction.to_string())
}

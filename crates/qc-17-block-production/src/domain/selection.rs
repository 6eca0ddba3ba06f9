//! Deterministic transaction selection

use primitive_types::U256;
use shared_types::{Address, Transaction};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Transaction selector service (core domain logic)
///
/// Priority-based greedy selection: highest gas price first, earlier arrival
/// wins ties, and each sender's transactions are taken in nonce order.
pub struct TransactionSelector {
    /// Block gas limit
    gas_limit: u64,

    /// Minimum gas price threshold
    min_gas_price: U256,
}

#[derive(Debug)]
struct TxRef {
    from: Address,
    idx: usize,
    gas_price: U256,
    arrival: usize,
}

impl PartialEq for TxRef {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TxRef {}

impl PartialOrd for TxRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TxRef {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap: higher price first, then lower arrival
        self.gas_price
            .cmp(&other.gas_price)
            .then_with(|| other.arrival.cmp(&self.arrival))
    }
}

impl TransactionSelector {
    /// Create new transaction selector
    pub fn new(gas_limit: u64, min_gas_price: U256) -> Self {
        Self {
            gas_limit,
            min_gas_price,
        }
    }

    /// Select and apply transactions.
    ///
    /// `candidates` are in arrival order. `apply` executes one transaction and
    /// returns the gas it used, `None` to reject it, or an error to abort
    /// selection. After a rejection only a later transaction of the same
    /// sender with the same nonce is still tried.
    ///
    /// Returns the indices of the applied transactions in execution order.
    pub fn select<F, E>(&self, candidates: &[Transaction], mut apply: F) -> Result<Vec<usize>, E>
    where
        F: FnMut(&Transaction) -> Result<Option<u64>, E>,
    {
        // Step 1: Group transactions by sender, filtering by minimum gas price
        let mut sender_txs: HashMap<Address, Vec<usize>> = HashMap::new();
        for (arrival, tx) in candidates.iter().enumerate() {
            if tx.gas_price < self.min_gas_price {
                continue;
            }
            sender_txs.entry(tx.from).or_default().push(arrival);
        }

        // Step 2: Sort each sender's transactions by nonce (ascending)
        for indices in sender_txs.values_mut() {
            indices.sort_by_key(|&i| (candidates[i].nonce, i));
        }

        // Step 3: Seed the priority queue with each sender's lowest nonce
        let mut pq: BinaryHeap<TxRef> = sender_txs
            .iter()
            .filter_map(|(from, indices)| {
                indices.first().map(|&arrival| TxRef {
                    from: *from,
                    idx: 0,
                    gas_price: candidates[arrival].gas_price,
                    arrival,
                })
            })
            .collect();

        // Step 4: Greedy selection
        let mut selected = Vec::new();
        let mut total_gas = 0u64;

        while let Some(tx_ref) = pq.pop() {
            let indices = &sender_txs[&tx_ref.from];
            let tx = &candidates[tx_ref.arrival];

            if total_gas.saturating_add(tx.gas_limit) > self.gas_limit {
                continue;
            }

            let next_nonce = match apply(tx)? {
                Some(gas_used) => {
                    selected.push(tx_ref.arrival);
                    total_gas += gas_used;
                    tx.nonce.checked_add(1)
                }
                // A rejected transaction may have a same-nonce replacement
                None => Some(tx.nonce),
            };

            let next_idx = tx_ref.idx + 1;
            if let Some(&next) = indices.get(next_idx) {
                if Some(candidates[next].nonce) == next_nonce {
                    pq.push(TxRef {
                        from: tx_ref.from,
                        idx: next_idx,
                        gas_price: candidates[next].gas_price,
                        arrival: next,
                    });
                }
            }
        }

        tracing::debug!(
            selected = selected.len(),
            total_gas,
            gas_limit = self.gas_limit,
            "[qc-17] Transaction selection complete"
        );

        Ok(selected)
    }
}

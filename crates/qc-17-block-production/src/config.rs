//! Configuration types for block production

use crate::error::{MinerError, Result};
use primitive_types::U256;
use serde::Deserialize;
use shared_types::Address;
use std::time::Duration;
use tracing::warn;

/// Maximum number of bytes a block's extra data may carry
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

/// Smallest recommit interval the scheduler honours (milliseconds)
pub const MIN_RECOMMIT_INTERVAL_MS: u64 = 1_000;

/// Runtime configuration for block production
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    /// Address that signs consensus messages
    pub validator: Address,

    /// Recipient of transaction fees (header coinbase)
    pub fee_recipient: Address,

    /// Extra data placed in each header
    pub extra_data: Vec<u8>,

    /// Seal blocks that carry no transactions
    pub allow_empty_blocks: bool,

    /// Resubmit work when new transactions arrive (None disables the timer)
    pub recommit_interval_ms: Option<u64>,

    /// Block gas limit
    pub gas_limit: u64,

    /// Minimum gas price
    pub min_gas_price: U256,

    /// Pending tasks this many blocks behind the head are discarded
    pub stale_threshold: u64,

    /// Capacity of the sealed-result channel shared with the engine
    pub result_queue_size: usize,

    /// Submit a first round of work as soon as the producer is built
    pub init: bool,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            validator: [0u8; 20],
            fee_recipient: [0u8; 20],
            extra_data: Vec::new(),
            allow_empty_blocks: true,
            recommit_interval_ms: None,
            gas_limit: crate::DEFAULT_GAS_LIMIT,
            min_gas_price: U256::from(crate::DEFAULT_MIN_GAS_PRICE),
            stale_threshold: crate::STALE_THRESHOLD,
            result_queue_size: crate::RESULT_QUEUE_SIZE,
            init: false,
        }
    }
}

impl MinerConfig {
    /// Check the configuration for values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.extra_data.len() > MAX_EXTRA_DATA_SIZE {
            return Err(MinerError::ExtraDataTooLong {
                len: self.extra_data.len(),
                max: MAX_EXTRA_DATA_SIZE,
            });
        }
        if self.gas_limit == 0 {
            return Err(MinerError::InvalidConfig("gas_limit must be non-zero".into()));
        }
        if self.stale_threshold == 0 {
            return Err(MinerError::InvalidConfig(
                "stale_threshold must be non-zero".into(),
            ));
        }
        if self.result_queue_size == 0 {
            return Err(MinerError::InvalidConfig(
                "result_queue_size must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Effective recommit interval, clamped to [`MIN_RECOMMIT_INTERVAL_MS`].
    pub fn recommit_interval(&self) -> Option<Duration> {
        self.recommit_interval_ms.map(|ms| {
            if ms < MIN_RECOMMIT_INTERVAL_MS {
                warn!(
                    provided = ms,
                    updated = MIN_RECOMMIT_INTERVAL_MS,
                    "[qc-17] Sanitizing miner recommit interval"
                );
                Duration::from_millis(MIN_RECOMMIT_INTERVAL_MS)
            } else {
                Duration::from_millis(ms)
            }
        })
    }
}

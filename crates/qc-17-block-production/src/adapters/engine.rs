//! Nonce-search sealing engine
//!
//! Seals a block by finding a nonce whose double SHA-256 over the seal hash
//! has at least `difficulty_bits` leading zero bits. With zero bits every
//! nonce qualifies, which makes the engine an instant sealer.

use crate::error::SealError;
use crate::ports::{ChainStore, ConsensusEngine, ExecutionState};
use sha2::{Digest, Sha256};
use shared_types::{Block, Hash, Header};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Nonces tried between cancellation checks
const YIELD_EVERY: u64 = 1024;

/// Highest accepted difficulty
pub const MAX_DIFFICULTY_BITS: u32 = 32;

fn pow_hash(seal_hash: &Hash, nonce: u64) -> Hash {
    let first = Sha256::new()
        .chain_update(seal_hash)
        .chain_update(nonce.to_le_bytes())
        .finalize();
    Sha256::digest(first).into()
}

fn leading_zero_bits(hash: &Hash) -> u32 {
    let mut bits = 0;
    for byte in hash {
        if *byte == 0 {
            bits += 8;
            continue;
        }
        bits += byte.leading_zeros();
        break;
    }
    bits
}

/// Proof-of-work style engine with a fixed difficulty
#[derive(Debug, Default)]
pub struct InstantSealEngine {
    difficulty_bits: u32,
    sealed: Arc<AtomicU64>,
}

impl InstantSealEngine {
    /// Engine that accepts the first nonce tried
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine requiring `bits` leading zero bits, capped at [`MAX_DIFFICULTY_BITS`]
    pub fn with_difficulty(bits: u32) -> Self {
        Self {
            difficulty_bits: bits.min(MAX_DIFFICULTY_BITS),
            ..Self::default()
        }
    }

    /// Leading zero bits a seal must reach
    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    /// Blocks this engine has sealed and delivered
    pub fn sealed_count(&self) -> u64 {
        self.sealed.load(Ordering::Relaxed)
    }

    /// Check that `header` carries a nonce meeting the difficulty
    pub fn verify_seal(&self, header: &Header) -> bool {
        let Ok(nonce) = <[u8; 8]>::try_from(header.seal.as_slice()) else {
            return false;
        };
        let hash = pow_hash(&header.seal_hash(), u64::from_le_bytes(nonce));
        leading_zero_bits(&hash) >= self.difficulty_bits
    }
}

impl<S: ExecutionState> ConsensusEngine<S> for InstantSealEngine {
    fn seal_hash(&self, header: &Header) -> Hash {
        header.seal_hash()
    }

    fn seal(
        &self,
        _chain: &dyn ChainStore<S>,
        block: Block,
        results: mpsc::Sender<Option<Block>>,
        stop: CancellationToken,
    ) -> Result<(), SealError> {
        if stop.is_cancelled() {
            return Err(SealError::Cancelled);
        }

        let difficulty = self.difficulty_bits;
        let sealed = Arc::clone(&self.sealed);
        tokio::spawn(async move {
            let seal_hash = block.header.seal_hash();
            let mut nonce = 0u64;
            loop {
                if leading_zero_bits(&pow_hash(&seal_hash, nonce)) >= difficulty {
                    break;
                }
                nonce = nonce.wrapping_add(1);
                if nonce % YIELD_EVERY == 0 {
                    if stop.is_cancelled() {
                        debug!(number = block.number(), "[qc-17] Nonce search abandoned");
                        return;
                    }
                    tokio::task::yield_now().await;
                }
            }

            if stop.is_cancelled() {
                return;
            }
            let sealed_block = block.with_seal(nonce.to_le_bytes().to_vec());
            tokio::select! {
                _ = stop.cancelled() => {}
                sent = results.send(Some(sealed_block)) => match sent {
                    Ok(()) => {
                        sealed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => warn!("[qc-17] Sealing result is not read by the committer"),
                },
            }
        });
        Ok(())
    }
}

//! Resolves sealed blocks against pending tasks and writes them to the chain

use super::PipelineContext;
use crate::domain::{format_ether, stamp_receipts, total_fees};
use crate::ports::ExecutionState;
use shared_bus::BlockchainEvent;
use shared_types::Block;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

/// What the committer did with a sealed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The chain already holds this block
    Duplicate,
    /// No pending task matches the block's seal hash
    UnknownTask,
    /// The chain store rejected the write
    WriteFailed,
    /// Written and announced
    Committed,
}

pub(crate) struct ResultCommitter<S: ExecutionState> {
    ctx: Arc<PipelineContext<S>>,
    result_rx: mpsc::Receiver<Option<Block>>,
    shutdown: CancellationToken,
}

impl<S: ExecutionState> ResultCommitter<S> {
    pub(crate) fn new(
        ctx: Arc<PipelineContext<S>>,
        result_rx: mpsc::Receiver<Option<Block>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            result_rx,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("[qc-17] Result committer started");
        loop {
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.result_rx.recv() => match result {
                    Some(result) => result,
                    None => break,
                },
            };
            if let Some(block) = result {
                self.commit(block).await;
            }
        }
        info!("[qc-17] Result committer stopped");
    }

    pub(crate) async fn commit(&self, block: Block) -> CommitOutcome {
        let hash = block.hash();
        let number = block.number();

        // Resubmitted seals can deliver a block that is already in the chain
        if self.ctx.chain.has_block(&hash, number) {
            trace!(number, hash = %hex::encode(hash), "[qc-17] Ignoring duplicate sealing result");
            return CommitOutcome::Duplicate;
        }

        let seal_hash = self.ctx.engine.seal_hash(&block.header);
        let Some(task) = self.ctx.pending.get(&seal_hash) else {
            error!(
                number,
                sealhash = %hex::encode(seal_hash),
                hash = %hex::encode(hash),
                "[qc-17] Block found but no relative pending task"
            );
            return CommitOutcome::UnknownTask;
        };

        let (receipts, logs) = stamp_receipts(&task.receipts, hash, number);
        if let Err(err) = self
            .ctx
            .chain
            .write_block(&block, &receipts, &logs, &task.state, true)
        {
            error!(number, %err, "[qc-17] Failed writing block to chain");
            return CommitOutcome::WriteFailed;
        }
        self.ctx.pending.remove(&seal_hash);

        let elapsed = task.created_at.elapsed();
        self.ctx.metrics.record_commit_latency(elapsed);
        self.ctx
            .metrics
            .record_finalization_time(since_timestamp(block.time()));
        self.ctx.metrics.record_block_sealed(block.transactions.len());
        self.ctx.metrics.record_pending_tasks(self.ctx.pending.len());

        info!(
            number,
            sealhash = %hex::encode(seal_hash),
            hash = %hex::encode(hash),
            txs = block.transactions.len(),
            fees = %format_ether(total_fees(&block, &receipts)),
            elapsed = ?elapsed,
            "[qc-17] ⛏️ Successfully sealed new block"
        );

        self.ctx
            .events
            .publish(BlockchainEvent::NewMinedBlock(block))
            .await;
        CommitOutcome::Committed
    }
}

/// Time elapsed since a block timestamp, zero if it lies in the future
fn since_timestamp(timestamp: u64) -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH + Duration::from_secs(timestamp))
        .unwrap_or_default()
}

//! Executes build requests into sealing tasks

use super::PipelineContext;
use crate::domain::{BuildRequest, SealingTask};
use crate::error::ExecutionError;
use crate::ports::{BuildContext, ExecutionState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub(crate) struct BlockAssembler<S: ExecutionState> {
    ctx: Arc<PipelineContext<S>>,
    build_rx: mpsc::Receiver<BuildRequest>,
    task_tx: mpsc::Sender<Arc<SealingTask<S>>>,
    shutdown: CancellationToken,
}

impl<S: ExecutionState> BlockAssembler<S> {
    pub(crate) fn new(
        ctx: Arc<PipelineContext<S>>,
        build_rx: mpsc::Receiver<BuildRequest>,
        task_tx: mpsc::Sender<Arc<SealingTask<S>>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            build_rx,
            task_tx,
            shutdown,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("[qc-17] Block assembler started");
        loop {
            let request = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                request = self.build_rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };
            if let Some(task) = self.assemble(request).await {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => break,
                    sent = self.task_tx.send(task) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        }
        info!("[qc-17] Block assembler stopped");
    }

    /// Build one candidate.
    ///
    /// Refreshes the pending snapshot on success. Returns the task to seal,
    /// or `None` when the build was superseded, failed, produced a
    /// placeholder, or the producer is not running.
    pub(crate) async fn assemble(&self, request: BuildRequest) -> Option<Arc<SealingTask<S>>> {
        if request.token.is_superseded() {
            debug!(reason = ?request.token.reason(), "[qc-17] Skipping superseded build request");
            return None;
        }
        self.ctx.engine.on_new_work();

        let settings = self.ctx.settings.read().clone();
        let parent = self.ctx.chain.current_header();
        let parent_hash = parent.hash();
        let Some(parent_state) = self.ctx.chain.state_at(&parent_hash) else {
            error!(
                number = parent.number,
                hash = %hex::encode(parent_hash),
                "[qc-17] No state for chain head"
            );
            return None;
        };

        let number = parent.number + 1;
        let build = BuildContext {
            parent,
            timestamp: request.timestamp,
            coinbase: settings.fee_recipient,
            extra_data: settings.extra_data,
            gas_limit: self.ctx.gas_limit,
            min_gas_price: self.ctx.min_gas_price,
            allow_empty: request.allow_empty && settings.allow_empty_blocks,
            transactions: self.ctx.tx_source.pending_transactions(),
        };

        let executor = Arc::clone(&self.ctx.executor);
        let token = request.token.clone();
        let started = Instant::now();
        let result =
            tokio::task::spawn_blocking(move || executor.execute(build, parent_state, &token)).await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(ExecutionError::Interrupted(reason))) => {
                debug!(number, ?reason, "[qc-17] Block construction interrupted");
                return None;
            }
            Ok(Err(err)) => {
                warn!(number, %err, "[qc-17] Block construction failed");
                return None;
            }
            Err(err) => {
                error!(number, %err, "[qc-17] Block construction task failed");
                return None;
            }
        };
        let elapsed = started.elapsed();
        self.ctx.metrics.record_build_duration(elapsed);

        if request.token.is_superseded() {
            debug!(number, "[qc-17] Discarding superseded candidate");
            return None;
        }

        self.ctx
            .snapshot
            .update(outcome.block.clone(), outcome.state.copy());

        if outcome.placeholder || !self.ctx.running.load(Ordering::SeqCst) {
            return None;
        }

        let task = Arc::new(SealingTask::new(outcome.block, outcome.receipts, outcome.state));
        if let Some(hook) = &self.ctx.hooks.full_task {
            hook(&task);
        }
        info!(
            number,
            txs = task.block.transactions.len(),
            gas = task.block.header.gas_used,
            elapsed = ?elapsed,
            "[qc-17] Commit new mining work"
        );
        Some(task)
    }
}

//! Turns start, chain-head and recommit signals into build requests

use super::{unix_now, PipelineContext};
use crate::domain::{BuildRequest, InterruptReason, InterruptToken};
use crate::ports::ExecutionState;
use shared_bus::BlockchainEvent;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub(crate) struct WorkScheduler<S: ExecutionState> {
    ctx: Arc<PipelineContext<S>>,
    start_rx: mpsc::Receiver<()>,
    build_tx: mpsc::Sender<BuildRequest>,
    recommit: Option<Duration>,
    shutdown: CancellationToken,
    current: Option<InterruptToken>,
}

impl<S: ExecutionState> WorkScheduler<S> {
    pub(crate) fn new(
        ctx: Arc<PipelineContext<S>>,
        start_rx: mpsc::Receiver<()>,
        build_tx: mpsc::Sender<BuildRequest>,
        recommit: Option<Duration>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            start_rx,
            build_tx,
            recommit,
            shutdown,
            current: None,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut heads = self.ctx.chain.subscribe_chain_head();
        let mut txs = self.ctx.tx_source.subscribe_new_transactions();
        let mut timer = self
            .recommit
            .map(|period| time::interval_at(Instant::now() + period, period));

        info!("[qc-17] Work scheduler started");

        loop {
            let reason = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                Some(()) = self.start_rx.recv() => {
                    self.clear_pending(self.ctx.chain.current_height());
                    InterruptReason::NewHead
                }
                Some(event) = heads.recv() => match event {
                    BlockchainEvent::ChainHead { header, .. } => {
                        self.clear_pending(header.number);
                        InterruptReason::NewHead
                    }
                    _ => continue,
                },
                Some(event) = txs.recv() => {
                    if let BlockchainEvent::NewTransactions { hashes } = event {
                        self.ctx
                            .new_txs
                            .fetch_add(hashes.len() as u64, Ordering::Relaxed);
                    }
                    continue;
                }
                _ = next_tick(&mut timer) => {
                    if !self.ctx.running.load(Ordering::SeqCst)
                        || self.ctx.new_txs.load(Ordering::Relaxed) == 0
                    {
                        continue;
                    }
                    InterruptReason::Resubmit
                }
            };

            if !self.commit(reason).await {
                break;
            }
            if let Some(timer) = timer.as_mut() {
                timer.reset();
            }
        }

        info!("[qc-17] Work scheduler stopped");
    }

    /// Supersede the live build and hand a fresh request to the assembler.
    ///
    /// Returns false once the pipeline is shutting down.
    async fn commit(&mut self, reason: InterruptReason) -> bool {
        if let Some(previous) = self.current.take() {
            previous.supersede(reason);
        }
        let token = InterruptToken::new();
        self.current = Some(token.clone());

        let request = BuildRequest {
            token,
            allow_empty: self.ctx.settings.read().allow_empty_blocks,
            timestamp: unix_now(),
        };
        debug!(?reason, "[qc-17] Submitting new work");

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            sent = self.build_tx.send(request) => {
                if sent.is_err() {
                    return false;
                }
            }
        }

        self.ctx.new_txs.store(0, Ordering::Relaxed);
        true
    }

    fn clear_pending(&self, head: u64) {
        let evicted = self.ctx.pending.clear_stale(head);
        if evicted > 0 {
            debug!(head, evicted, "[qc-17] Cleared stale pending tasks");
        }
        self.ctx.metrics.record_pending_tasks(self.ctx.pending.len());
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

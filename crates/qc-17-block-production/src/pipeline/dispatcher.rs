//! Hands sealing tasks to the consensus engine, one seal in flight at a time

use super::PipelineContext;
use crate::domain::SealingTask;
use crate::ports::ExecutionState;
use shared_types::{Block, Hash};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the dispatcher did with a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Same seal hash as the task being sealed; dropped
    Duplicate,
    /// Vetoed by the skip-seal hook
    Skipped,
    /// Recorded and handed to the engine
    Delegated,
    /// Recorded, but the engine refused to seal
    SealFailed,
}

pub(crate) struct SealingDispatcher<S: ExecutionState> {
    ctx: Arc<PipelineContext<S>>,
    task_rx: mpsc::Receiver<Arc<SealingTask<S>>>,
    results: mpsc::Sender<Option<Block>>,
    shutdown: CancellationToken,
    prev: Option<Hash>,
    stop: Option<CancellationToken>,
}

impl<S: ExecutionState> SealingDispatcher<S> {
    pub(crate) fn new(
        ctx: Arc<PipelineContext<S>>,
        task_rx: mpsc::Receiver<Arc<SealingTask<S>>>,
        results: mpsc::Sender<Option<Block>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            task_rx,
            results,
            shutdown,
            prev: None,
            stop: None,
        }
    }

    pub(crate) async fn run(mut self) {
        info!("[qc-17] Sealing dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                task = self.task_rx.recv() => match task {
                    Some(task) => {
                        self.dispatch(task);
                    }
                    None => break,
                },
            }
        }
        self.interrupt();
        info!("[qc-17] Sealing dispatcher stopped");
    }

    pub(crate) fn dispatch(&mut self, task: Arc<SealingTask<S>>) -> DispatchOutcome {
        if let Some(hook) = &self.ctx.hooks.new_task {
            hook(&task);
        }

        // Resubmission can hand us the same candidate again
        let seal_hash = self.ctx.engine.seal_hash(&task.block.header);
        if self.prev == Some(seal_hash) {
            debug!(sealhash = %hex::encode(seal_hash), "[qc-17] Skipping duplicate sealing work");
            return DispatchOutcome::Duplicate;
        }

        self.interrupt();
        let stop = CancellationToken::new();
        self.stop = Some(stop.clone());
        self.prev = Some(seal_hash);

        if let Some(skip) = &self.ctx.hooks.skip_seal {
            if skip(&task) {
                return DispatchOutcome::Skipped;
            }
        }

        self.ctx.pending.insert(seal_hash, Arc::clone(&task));
        self.ctx.metrics.record_pending_tasks(self.ctx.pending.len());

        if let Err(err) = self.ctx.engine.seal(
            self.ctx.chain.as_ref(),
            task.block.clone(),
            self.results.clone(),
            stop,
        ) {
            self.ctx.metrics.record_seal_failure();
            warn!(number = task.number(), %err, "[qc-17] Block sealing failed");
            return DispatchOutcome::SealFailed;
        }
        DispatchOutcome::Delegated
    }

    /// Cancel the seal in flight, if any
    fn interrupt(&mut self) {
        if let Some(stop) = self.stop.take() {
            stop.cancel();
        }
    }
}

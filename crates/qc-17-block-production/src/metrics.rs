//! Metrics collection for block production subsystem

use quantum_telemetry::{
    MINER_BLOCKS_SEALED, MINER_BLOCK_CONSTRUCT, MINER_BLOCK_FINALIZATION, MINER_COMMIT_LATENCY,
    MINER_PENDING_TASKS, MINER_SEAL_FAILURES,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sink for pipeline timings and counters
pub trait MetricsSink: Send + Sync {
    /// Time spent executing a candidate
    fn record_build_duration(&self, elapsed: Duration);

    /// Time from task creation to chain write
    fn record_commit_latency(&self, elapsed: Duration);

    /// Time from block timestamp to chain write
    fn record_finalization_time(&self, elapsed: Duration);

    /// A sealed block was committed
    fn record_block_sealed(&self, tx_count: usize);

    /// The engine refused a seal
    fn record_seal_failure(&self);

    /// Current number of pending tasks
    fn record_pending_tasks(&self, _count: usize) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_build_duration(&self, _elapsed: Duration) {}
    fn record_commit_latency(&self, _elapsed: Duration) {}
    fn record_finalization_time(&self, _elapsed: Duration) {}
    fn record_block_sealed(&self, _tx_count: usize) {}
    fn record_seal_failure(&self) {}
}

/// Metrics collector for block production
///
/// Keeps its own counters and mirrors every observation into the Prometheus
/// collectors registered by `quantum-telemetry`.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Candidates built
    pub builds: AtomicU64,

    /// Blocks sealed and committed
    pub blocks_sealed: AtomicU64,

    /// Transactions in committed blocks
    pub transactions_included: AtomicU64,

    /// Seal invocations that failed
    pub seal_failures: AtomicU64,

    /// Most recent commit latency (milliseconds)
    pub last_commit_latency_ms: AtomicU64,

    /// Most recent finalization time (milliseconds)
    pub last_finalization_ms: AtomicU64,

    /// Total build time (microseconds)
    pub build_time_us: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidates built
    pub fn build_count(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }

    /// Blocks sealed and committed
    pub fn blocks_sealed(&self) -> u64 {
        self.blocks_sealed.load(Ordering::Relaxed)
    }

    /// Seal failures
    pub fn seal_failures(&self) -> u64 {
        self.seal_failures.load(Ordering::Relaxed)
    }

    /// Most recent commit latency
    pub fn last_commit_latency_ms(&self) -> u64 {
        self.last_commit_latency_ms.load(Ordering::Relaxed)
    }

    /// Most recent finalization time
    pub fn last_finalization_ms(&self) -> u64 {
        self.last_finalization_ms.load(Ordering::Relaxed)
    }

    /// Get average transactions per sealed block
    pub fn avg_transactions_per_block(&self) -> f64 {
        let blocks = self.blocks_sealed.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        let txs = self.transactions_included.load(Ordering::Relaxed);
        txs as f64 / blocks as f64
    }

    /// Get average build time (microseconds)
    pub fn avg_build_time_us(&self) -> f64 {
        let builds = self.builds.load(Ordering::Relaxed);
        if builds == 0 {
            return 0.0;
        }
        self.build_time_us.load(Ordering::Relaxed) as f64 / builds as f64
    }
}

impl MetricsSink for Metrics {
    fn record_build_duration(&self, elapsed: Duration) {
        self.builds.fetch_add(1, Ordering::Relaxed);
        self.build_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
        MINER_BLOCK_CONSTRUCT.observe(elapsed.as_secs_f64());
    }

    fn record_commit_latency(&self, elapsed: Duration) {
        self.last_commit_latency_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        MINER_COMMIT_LATENCY.observe(elapsed.as_secs_f64());
    }

    fn record_finalization_time(&self, elapsed: Duration) {
        self.last_finalization_ms
            .store(elapsed.as_millis() as u64, Ordering::Relaxed);
        MINER_BLOCK_FINALIZATION.set(elapsed.as_secs_f64());
    }

    fn record_block_sealed(&self, tx_count: usize) {
        self.blocks_sealed.fetch_add(1, Ordering::Relaxed);
        self.transactions_included
            .fetch_add(tx_count as u64, Ordering::Relaxed);
        MINER_BLOCKS_SEALED.inc();
    }

    fn record_seal_failure(&self) {
        self.seal_failures.fetch_add(1, Ordering::Relaxed);
        MINER_SEAL_FAILURES.inc();
    }

    fn record_pending_tasks(&self, count: usize) {
        MINER_PENDING_TASKS.set(count as f64);
    }
}

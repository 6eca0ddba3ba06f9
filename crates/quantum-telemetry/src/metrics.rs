//! Prometheus metrics for the block production pipeline.
//!
//! All metrics follow the naming convention: `qc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., blocks_sealed_total)
//! - **Gauge**: Value that can go up or down (e.g., pending_tasks)
//! - **Histogram**: Distribution of values (e.g., commit_latency_seconds)

use lazy_static::lazy_static;
use prometheus::{exponential_buckets, Counter, Encoder, Gauge, Histogram, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BLOCK PRODUCTION METRICS (Subsystem 17)
    // =========================================================================

    /// Time spent assembling a candidate block
    pub static ref MINER_BLOCK_CONSTRUCT: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_miner_block_construct_seconds",
            "Time spent executing transactions into a candidate block"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).unwrap_or_default())
    ).expect("metric creation failed");

    /// Time from sealing-task creation to chain write
    pub static ref MINER_COMMIT_LATENCY: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "qc_miner_commit_latency_seconds",
            "Time from sealing task creation to the block being written"
        ).buckets(exponential_buckets(0.001, 2.0, 16).unwrap_or_default())
    ).expect("metric creation failed");

    /// Time from the block timestamp to the chain write
    pub static ref MINER_BLOCK_FINALIZATION: Gauge = Gauge::new(
        "qc_miner_block_finalization_seconds",
        "Seconds between a mined block's timestamp and its chain write"
    ).expect("metric creation failed");

    /// Total locally sealed blocks written to the chain
    pub static ref MINER_BLOCKS_SEALED: Counter = Counter::new(
        "qc_miner_blocks_sealed_total",
        "Total number of locally sealed blocks committed to the chain"
    ).expect("metric creation failed");

    /// Seal invocations rejected by the consensus engine
    pub static ref MINER_SEAL_FAILURES: Counter = Counter::new(
        "qc_miner_seal_failures_total",
        "Total seal invocations that returned an error"
    ).expect("metric creation failed");

    /// Tasks currently awaiting a sealing result
    pub static ref MINER_PENDING_TASKS: Gauge = Gauge::new(
        "qc_miner_pending_tasks",
        "Number of sealing tasks awaiting a result"
    ).expect("metric creation failed");
}

/// Register all miner metrics with the global registry.
///
/// Safe to call more than once; collectors already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(MINER_BLOCK_CONSTRUCT.clone()),
        Box::new(MINER_COMMIT_LATENCY.clone()),
        Box::new(MINER_BLOCK_FINALIZATION.clone()),
        Box::new(MINER_BLOCKS_SEALED.clone()),
        Box::new(MINER_SEAL_FAILURES.clone()),
        Box::new(MINER_PENDING_TASKS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

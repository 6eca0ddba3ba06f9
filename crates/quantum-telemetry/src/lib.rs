//! # Quantum Telemetry
//!
//! Logging and metrics plumbing shared by Quantum-Chain subsystems.
//!
//! ## Components
//!
//! - **Logs**: `tracing` subscriber with `EnvFilter`, pretty or JSON output
//! - **Metrics**: Prometheus registry with the block production collectors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quantum_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_subsystem("17", "block-production")?;
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `quantum-chain` | Service name in logs |
//! | `QC_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `QC_CONSOLE_OUTPUT` | `true` | Log to stdout |
//! | `QC_JSON_LOGS` | `true` in containers | JSON log lines |
//! | `QC_SUBSYSTEM_ID` | `00` | Subsystem identifier |

#![warn(missing_docs)]

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, MINER_BLOCKS_SEALED, MINER_BLOCK_CONSTRUCT,
    MINER_BLOCK_FINALIZATION, MINER_COMMIT_LATENCY, MINER_PENDING_TASKS, MINER_SEAL_FAILURES,
};
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A global subscriber could not be installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    /// Metrics could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// The configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the tracing subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // Initialize metrics first so early log lines can reference them
    register_metrics()?;
    init_tracing(config)
}

//! Telemetry configuration from environment variables.

use crate::TelemetryError;
use std::env;

const DEFAULT_SERVICE: &str = "quantum-chain";
const UNASSIGNED_SUBSYSTEM: &str = "00";

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to log lines
    pub service_name: String,

    /// Subsystem identifier (17 for block production)
    pub subsystem_id: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive string
    pub log_level: String,

    /// Write log lines to stdout
    pub console_output: bool,

    /// One JSON object per log line
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE.to_string(),
            subsystem_id: UNASSIGNED_SUBSYSTEM.to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

fn parse_flag(name: &str, value: Option<String>, default: bool) -> Result<bool, TelemetryError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TelemetryError::Config(format!("{name}={other} is not a boolean"))),
    }
}

impl TelemetryConfig {
    /// Read the configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OTEL_SERVICE_NAME` | `quantum-chain` |
    /// | `QC_SUBSYSTEM_ID` | `00` |
    /// | `QC_LOG_LEVEL`, then `RUST_LOG` | `info` |
    /// | `QC_CONSOLE_OUTPUT` | `true` |
    /// | `QC_JSON_LOGS` | `true` inside a container, else `false` |
    pub fn from_env() -> Result<Self, TelemetryError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TelemetryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let in_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Ok(Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE.into()),
            subsystem_id: lookup("QC_SUBSYSTEM_ID")
                .unwrap_or_else(|| UNASSIGNED_SUBSYSTEM.into()),
            log_level: lookup("QC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".into()),
            console_output: parse_flag("QC_CONSOLE_OUTPUT", lookup("QC_CONSOLE_OUTPUT"), true)?,
            json_logs: parse_flag("QC_JSON_LOGS", lookup("QC_JSON_LOGS"), in_container)?,
        })
    }

    /// Environment configuration named after a subsystem, e.g.
    /// `qc-17-block-production`.
    pub fn for_subsystem(subsystem_id: &str, subsystem_name: &str) -> Result<Self, TelemetryError> {
        let mut config = Self::from_env()?;
        config.subsystem_id = subsystem_id.to_string();
        config.service_name = format!("qc-{subsystem_id}-{subsystem_name}");
        Ok(config)
    }

    /// Service name with the subsystem suffix, if one is assigned.
    pub fn full_service_name(&self) -> String {
        if self.subsystem_id == UNASSIGNED_SUBSYSTEM {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.subsystem_id)
        }
    }
}

//! # Quiz Telemetry
//!
//! Observability for the Quiz Battle client.
//!
//! ## Components
//!
//! - **Logging**: `tracing` subscriber with an env filter and a pretty or JSON formatter
//! - **Metrics**: Prometheus counters and histograms for state refreshes and transactions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quiz_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     let _guard = init_telemetry(&config).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QB_SERVICE_NAME` | `quiz-battle` | Service name attached to logs |
//! | `QB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `QB_JSON_LOGS` | `false` | Emit JSON lines instead of pretty output |
//! | `QB_CONSOLE_OUTPUT` | `true` | Write logs to stderr at all |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, REFRESH_DURATION, SYNC_REFRESHES,
    TX_SUBMISSIONS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Configuration was rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard { _metrics: metrics })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Log a transaction-related event with standard fields.
///
/// ```rust,ignore
/// log_tx_event!(info, "submit_answer", "Transaction confirmed", tx_hash);
/// ```
#[macro_export]
macro_rules! log_tx_event {
    ($level:ident, $operation:expr, $msg:expr, $tx_hash:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            operation = $operation,
            tx_hash = %$tx_hash,
            $($($field)*,)?
            $msg
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_service_name() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "quiz-battle");
    }

    #[test]
    fn test_error_messages() {
        let err = TelemetryError::Config("bad level".to_string());
        assert!(err.to_string().contains("bad level"));
    }
}

//! Prometheus metrics for the Quiz Battle client.
//!
//! All metrics follow the naming convention: `qb_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// State refreshes by field and outcome (applied/coalesced/failed/discarded)
    pub static ref SYNC_REFRESHES: CounterVec = CounterVec::new(
        Opts::new("qb_sync_refreshes_total", "State refreshes by field and outcome"),
        &["field", "outcome"]
    ).expect("metric creation failed");

    /// Read latency per refreshed field
    pub static ref REFRESH_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "qb_sync_refresh_duration_seconds",
            "Time spent reading one field from the contract"
        ).buckets(exponential_buckets(0.005, 2.0, 12).expect("valid buckets")),
        &["field"]
    ).expect("metric creation failed");

    /// Submitted transactions by operation and terminal status
    pub static ref TX_SUBMISSIONS: CounterVec = CounterVec::new(
        Opts::new("qb_tx_submissions_total", "Transactions by operation and outcome"),
        &["operation", "status"]
    ).expect("metric creation failed");
}

/// Handle keeping the registry alive.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SYNC_REFRESHES.clone()),
        Box::new(REFRESH_DURATION.clone()),
        Box::new(TX_SUBMISSIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
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

//! Metrics emission seam — fire-and-forget counters.
//!
//! The pipeline increments one counter per successfully extracted code,
//! dimensioned by environment and tenant. Emission is fire-and-forget:
//! the sink returns nothing and a failing backend must swallow its own
//! errors, so the message outcome is never affected.

use async_trait::async_trait;
use tracing::info;

/// Sink for relay counters.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Count one successfully processed code.
    async fn codes_processed(&self, environment: &str, tenant: &str);
}

/// Default sink: emits the counter as a structured log line.
pub struct LogMetricsSink;

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn codes_processed(&self, environment: &str, tenant: &str) {
        info!(
            metric = "codes_processed",
            value = 1,
            environment = %environment,
            tenant = %tenant,
            "metric"
        );
    }
}

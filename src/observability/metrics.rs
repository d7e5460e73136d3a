//! Metrics for location resolution.
//!
//! Recording goes through the `metrics` facade and is a no-op until a recorder is
//! installed with [`init`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::info;

use crate::error::{LocationError, Result};

/// Enum representing all metric names used by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    ResolutionsTotal,
    CandidatesPerQuery,
    RecordsFixed,
    RecordIssues,
    BatchesProcessed,
    BatchSize,
    BatchDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ResolutionsTotal => "location_resolutions_total",
            MetricName::CandidatesPerQuery => "location_candidates",
            MetricName::RecordsFixed => "location_records_fixed_total",
            MetricName::RecordIssues => "location_record_issues_total",
            MetricName::BatchesProcessed => "location_batches_total",
            MetricName::BatchSize => "location_batch_size",
            MetricName::BatchDuration => "location_batch_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        [
            MetricName::ResolutionsTotal,
            MetricName::CandidatesPerQuery,
            MetricName::RecordsFixed,
            MetricName::RecordIssues,
            MetricName::BatchesProcessed,
            MetricName::BatchSize,
            MetricName::BatchDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| LocationError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Current metrics in Prometheus text format, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Resolution Metrics
// ============================================================================

pub mod resolution {
    use super::MetricName;

    /// Record the granularity a query resolved to ("City", "Region", "Country" or "none")
    pub fn resolved(granularity: &'static str) {
        ::metrics::counter!(MetricName::ResolutionsTotal.as_str(), "granularity" => granularity)
            .increment(1);
    }

    pub fn candidates_found(count: usize) {
        ::metrics::histogram!(MetricName::CandidatesPerQuery.as_str()).record(count as f64);
    }
}

// ============================================================================
// Fixer Metrics
// ============================================================================

pub mod fixer {
    use super::MetricName;

    pub fn record_fixed() {
        ::metrics::counter!(MetricName::RecordsFixed.as_str()).increment(1);
    }

    pub fn issue_recorded(issue: &'static str) {
        ::metrics::counter!(MetricName::RecordIssues.as_str(), "issue" => issue).increment(1);
    }
}

// ============================================================================
// Batch Metrics
// ============================================================================

pub mod batch {
    use super::MetricName;

    pub fn batch_processed(batch_size: usize, duration_secs: f64) {
        ::metrics::counter!(MetricName::BatchesProcessed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::BatchSize.as_str()).record(batch_size as f64);
        ::metrics::histogram!(MetricName::BatchDuration.as_str()).record(duration_secs);
    }
}

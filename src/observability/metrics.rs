//! Metrics for the valuation engine
//!
//! Everything is recorded through the `metrics` facade; without an installed recorder the
//! calls are no-ops, so library users pay nothing unless they call [`init`].

use std::fmt;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Enum representing all metric names used by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run metrics
    RunsStarted,
    RunDuration,
    InsufficientData,

    // Stage metrics
    ComparablesReceived,
    NormalizeDropped,
    DedupRemoved,
    RangeStageApplied,
    OutliersRemoved,
    FinalComparables,

    // Result metrics
    ValuationsCompleted,
    ConfidenceAssigned,

    // Use case metrics
    ExtractionErrors,
    ReportWritesSuccess,
    ReportWritesError,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsStarted => "avaluo_runs_started_total",
            MetricName::RunDuration => "avaluo_run_duration_seconds",
            MetricName::InsufficientData => "avaluo_insufficient_data_total",

            MetricName::ComparablesReceived => "avaluo_comparables_received_total",
            MetricName::NormalizeDropped => "avaluo_normalize_dropped_total",
            MetricName::DedupRemoved => "avaluo_dedup_removed_total",
            MetricName::RangeStageApplied => "avaluo_range_stage_applied_total",
            MetricName::OutliersRemoved => "avaluo_outliers_removed_total",
            MetricName::FinalComparables => "avaluo_final_comparables",

            MetricName::ValuationsCompleted => "avaluo_valuations_completed_total",
            MetricName::ConfidenceAssigned => "avaluo_confidence_assigned_total",

            MetricName::ExtractionErrors => "avaluo_extraction_errors_total",
            MetricName::ReportWritesSuccess => "avaluo_report_writes_success_total",
            MetricName::ReportWritesError => "avaluo_report_writes_error_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RunsStarted,
            RunDuration,
            InsufficientData,
            ComparablesReceived,
            NormalizeDropped,
            DedupRemoved,
            RangeStageApplied,
            OutliersRemoved,
            FinalComparables,
            ValuationsCompleted,
            ConfidenceAssigned,
            ExtractionErrors,
            ReportWritesSuccess,
            ReportWritesError,
        ]
        .into_iter()
    }

    /// Returns (phase, description, unit)
    pub fn metadata(&self) -> (&'static str, &'static str, Option<&'static str>) {
        match self {
            MetricName::RunsStarted => ("run", "Valuation runs started", None),
            MetricName::RunDuration => ("run", "Valuation run duration", Some("s")),
            MetricName::InsufficientData => {
                ("run", "Runs ended for lack of valid comparables, by stage", None)
            }

            MetricName::ComparablesReceived => ("stages", "Raw comparables received", None),
            MetricName::NormalizeDropped => {
                ("stages", "Raw comparables dropped by the normalizer, by reason", None)
            }
            MetricName::DedupRemoved => ("stages", "Duplicate comparables removed", None),
            MetricName::RangeStageApplied => ("stages", "Range band settled on, by stage", None),
            MetricName::OutliersRemoved => ("stages", "Price-per-area outliers removed", None),
            MetricName::FinalComparables => ("stages", "Size of the final comparable set", None),

            MetricName::ValuationsCompleted => {
                ("result", "Valuations completed, by final value source", None)
            }
            MetricName::ConfidenceAssigned => ("result", "Confidence levels assigned", None),

            MetricName::ExtractionErrors => ("use_case", "Extraction source failures", None),
            MetricName::ReportWritesSuccess => ("use_case", "Reports written", None),
            MetricName::ReportWritesError => ("use_case", "Report write failures", None),
        }
    }
}

/// Install the Prometheus recorder. The handle renders a text snapshot on demand.
pub fn init() -> Result<PrometheusHandle, Box<dyn std::error::Error + Send + Sync>> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    for metric in MetricName::all_metrics() {
        let (phase, description, _) = metric.metadata();
        let description = format!("[{}] {}", phase, description);
        match metric {
            MetricName::RunDuration | MetricName::FinalComparables => {
                ::metrics::describe_histogram!(metric.as_str(), description)
            }
            _ => ::metrics::describe_counter!(metric.as_str(), description),
        }
    }

    info!("Metrics system initialized");
    Ok(handle)
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn run_started(received: usize) {
        ::metrics::counter!(MetricName::RunsStarted.as_str()).increment(1);
        ::metrics::counter!(MetricName::ComparablesReceived.as_str()).increment(received as u64);
    }

    pub fn run_duration(secs: f64) {
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }

    pub fn normalize_dropped(reason: &'static str) {
        ::metrics::counter!(MetricName::NormalizeDropped.as_str(), "reason" => reason).increment(1);
    }

    pub fn duplicates_removed(count: usize) {
        ::metrics::counter!(MetricName::DedupRemoved.as_str()).increment(count as u64);
    }

    pub fn range_stage(stage: &'static str) {
        ::metrics::counter!(MetricName::RangeStageApplied.as_str(), "stage" => stage).increment(1);
    }

    pub fn outliers_removed(count: usize) {
        ::metrics::counter!(MetricName::OutliersRemoved.as_str()).increment(count as u64);
    }

    pub fn final_comparables(count: usize) {
        ::metrics::histogram!(MetricName::FinalComparables.as_str()).record(count as f64);
    }

    pub fn insufficient_data(stage: &'static str) {
        ::metrics::counter!(MetricName::InsufficientData.as_str(), "stage" => stage).increment(1);
    }

    pub fn valuation_completed(source: &'static str, level: &'static str) {
        ::metrics::counter!(MetricName::ValuationsCompleted.as_str(), "source" => source)
            .increment(1);
        ::metrics::counter!(MetricName::ConfidenceAssigned.as_str(), "level" => level)
            .increment(1);
    }
}

// ============================================================================
// Use Case Metrics
// ============================================================================

pub mod use_case {
    use super::MetricName;

    pub fn extraction_error(source: &str) {
        ::metrics::counter!(MetricName::ExtractionErrors.as_str(), "source" => source.to_string())
            .increment(1);
    }

    pub fn report_written() {
        ::metrics::counter!(MetricName::ReportWritesSuccess.as_str()).increment(1);
    }

    pub fn report_write_error() {
        ::metrics::counter!(MetricName::ReportWritesError.as_str()).increment(1);
    }
}

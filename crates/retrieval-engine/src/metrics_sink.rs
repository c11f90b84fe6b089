//! Thin Prometheus-backed metrics adapter. Every adapter and the
//! orchestrator call into free functions here rather than holding their
//! own counters — consistent with this codebase's `metrics` module,
//! which also favors free functions over a passed-around struct.

use std::sync::OnceLock;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the process-wide Prometheus recorder. Call once, from each
/// binary's `main()`, before any other metrics function is used.
pub fn init_metrics() {
    if PROMETHEUS_HANDLE.get().is_some() {
        return;
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install prometheus recorder");
    let _ = PROMETHEUS_HANDLE.set(handle);
}

/// Renders the current metrics snapshot for a `/metrics` scrape
/// endpoint. Returns `None` if [`init_metrics`] was never called.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterOutcome {
    Success,
    Retry,
    CircuitOpen,
    Timeout,
    Failure,
}

impl AdapterOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            AdapterOutcome::Success => "success",
            AdapterOutcome::Retry => "retry",
            AdapterOutcome::CircuitOpen => "circuit_open",
            AdapterOutcome::Timeout => "timeout",
            AdapterOutcome::Failure => "failure",
        }
    }
}

/// Records one adapter call's outcome, labeled by adapter name.
pub fn record_adapter_call(adapter: &'static str, outcome: AdapterOutcome) {
    counter!("retrieval_adapter_calls_total", "adapter" => adapter, "outcome" => outcome.as_str())
        .increment(1);
}

pub fn record_adapter_latency(adapter: &'static str, seconds: f64) {
    histogram!("retrieval_adapter_latency_seconds", "adapter" => adapter).record(seconds);
}

/// Records a rate-limiter refusal, labeled by the scope that refused
/// (global/user/channel).
pub fn record_rate_limit_refusal(scope: &'static str) {
    counter!("retrieval_rate_limit_refusals_total", "scope" => scope).increment(1);
}

/// Records a dropped `ProgressEvent` due to a subscriber's buffer
/// overflowing — progress is advisory, but drops are worth watching in
/// aggregate.
pub fn record_progress_event_dropped() {
    counter!("retrieval_progress_events_dropped_total").increment(1);
}

/// Records how many refinement iterations one pipeline run took.
pub fn record_pipeline_iterations(count: usize) {
    histogram!("retrieval_pipeline_iterations").record(count as f64);
}

/// Records the fusion method chosen for one request.
pub fn record_search_method(method: &'static str) {
    counter!("retrieval_search_method_total", "method" => method).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(AdapterOutcome::Success.as_str(), "success");
        assert_eq!(AdapterOutcome::CircuitOpen.as_str(), "circuit_open");
    }
}

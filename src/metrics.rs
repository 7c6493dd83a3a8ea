use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramVec, IntCounterVec, TextEncoder,
    register_histogram, register_histogram_vec, register_int_counter_vec,
};
use std::time::Instant;

use crate::{ChartError, Result};

lazy_static! {
    // Request metrics
    pub static ref CHART_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "promchart_chart_requests_total",
        "Total number of chart requests received",
        &["format"]
    ).expect("chart request counter registers once");

    pub static ref CHART_FAILURES: IntCounterVec = register_int_counter_vec!(
        "promchart_chart_failures_total",
        "Chart requests that ended in an error, by error kind",
        &["kind"]
    ).expect("chart failure counter registers once");

    // Pipeline stage metrics
    pub static ref STAGE_DURATION: HistogramVec = register_histogram_vec!(
        "promchart_stage_duration_seconds",
        "Time spent in each pipeline stage",
        &["stage"],
        vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]
    ).expect("stage histogram registers once");

    pub static ref SERIES_PER_CHART: Histogram = register_histogram!(
        "promchart_series_per_chart",
        "Number of series drawn per rendered chart",
        vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    ).expect("series histogram registers once");
}

/// Touches every static so the families show up on `/metrics` before the
/// first chart is served.
pub fn init_metrics() {
    lazy_static::initialize(&CHART_REQUESTS);
    lazy_static::initialize(&CHART_FAILURES);
    lazy_static::initialize(&STAGE_DURATION);
    lazy_static::initialize(&SERIES_PER_CHART);
}

/// Observes the elapsed time of one pipeline stage when dropped.
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            start: Instant::now(),
        }
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        STAGE_DURATION
            .with_label_values(&[self.stage])
            .observe(duration);
    }
}

pub fn record_request(format: &str) {
    CHART_REQUESTS.with_label_values(&[format]).inc();
}

pub fn record_failure(err: &ChartError) {
    CHART_FAILURES.with_label_values(&[err.kind()]).inc();
}

pub fn record_series_count(count: usize) {
    SERIES_PER_CHART.observe(count as f64);
}

/// Renders the default registry in the Prometheus text format.
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| ChartError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| ChartError::Internal(format!("Metrics are not valid UTF-8: {}", e)))
}

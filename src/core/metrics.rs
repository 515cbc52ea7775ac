use std::sync::OnceLock;

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub(crate) const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub(crate) const QUESTION_IMPORT_ROWS_TOTAL: &str = "question_import_rows_total";
pub(crate) const EXAM_FINALIZED_TOTAL: &str = "exam_results_finalized_total";
pub(crate) const ANSWERS_SUBMITTED_TOTAL: &str = "exam_answers_submitted_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests by response status");
    describe_histogram!(HTTP_REQUEST_DURATION, Unit::Seconds, "HTTP request latency");
    describe_counter!(QUESTION_IMPORT_ROWS_TOTAL, "Manifest rows processed by bulk import");
    describe_counter!(EXAM_FINALIZED_TOTAL, "Exam results finalized");
    describe_counter!(ANSWERS_SUBMITTED_TOTAL, "Answers recorded by the session engine");
}

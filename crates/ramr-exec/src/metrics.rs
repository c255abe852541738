//! Metrics hooks.
//!
//! Everything goes out as `tracing` events under the `ramr::metrics` target;
//! the binary decides where they end up.

use crate::runtime::StageReport;

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::trace_span!("ramr", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(target: "ramr::metrics", %event, %k, %v, "metric");
    }
}

/// One event per finished stage.
pub fn record_stage(report: &StageReport) {
    tracing::info!(
        target: "ramr::metrics",
        step = report.step.get(),
        kind = %report.kind,
        records_in = report.records_in,
        records_out = report.records_out,
        attempts = report.attempts,
        elapsed_ms = report.elapsed_ms,
        "stage finished"
    );
}

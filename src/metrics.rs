use tracing::trace;

// Trace-level timing events; no exporter is installed.

pub fn fetch_elapsed(level: &'static str, elapsed_ms: u128, ok: bool) {
    trace!(
        target = "trucksbus.metrics",
        level = level,
        elapsed_ms = elapsed_ms as u64,
        ok = ok,
        "catalog_fetch_elapsed"
    );
}

pub fn submission_elapsed(endpoint: &str, elapsed_ms: u128, ok: bool) {
    trace!(
        target = "trucksbus.metrics",
        endpoint = endpoint,
        elapsed_ms = elapsed_ms as u64,
        ok = ok,
        "submission_elapsed"
    );
}

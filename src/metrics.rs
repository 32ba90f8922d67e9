use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register the scrape job's metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("scrape_runs_total").absolute(0);
    counter!("products_processed_total").absolute(0);
    counter!("products_matched_total").absolute(0);
    counter!("products_not_found_total").absolute(0);
    counter!("price_alerts_created_total").absolute(0);
    counter!("scrape_errors_total").absolute(0);

    // Histogram is lazily created on first record; force creation.
    histogram!("scrape_run_duration_seconds").record(0.0);

    Ok(handle)
}

use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::services::price_scraper::RunReport;
use crate::AppState;

/// Trigger a scrape every `interval_secs`. Ticks that land while a run is
/// still in progress (from this loop or the HTTP trigger) are skipped.
pub async fn run_scrape_scheduler(state: AppState, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let scraper = match state.scraper() {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Scheduled scrape skipped: run log storage not configured");
                continue;
            }
        };

        let Ok(_guard) = state.run_guard.try_lock() else {
            tracing::warn!("Previous scrape run still in progress, skipping scheduled tick");
            continue;
        };

        tracing::info!("Scheduled price scrape starting");

        match scraper.run().await {
            Ok(RunReport::Completed(summary)) => {
                tracing::info!(
                    run_id = %summary.run_id,
                    processed = summary.processed,
                    matched = summary.matched,
                    not_found = summary.not_found,
                    alerts = summary.alerts_created,
                    errors = summary.errors,
                    "Scheduled price scrape completed"
                );
            }
            Ok(RunReport::NoWork { run_id, .. }) => {
                tracing::debug!(run_id = %run_id, "Scheduled price scrape found nothing due");
            }
            Err(e) => {
                tracing::error!(run_id = %e.run_id, error = %e, "Scheduled price scrape failed");
            }
        }
    }
}

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod heb;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod run_log;
pub mod services;

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::db::PriceStore;
use crate::heb::PriceSource;
use crate::run_log::ArtifactStore;
use crate::services::PriceScraper;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn PriceStore>,
    pub source: Arc<dyn PriceSource>,
    /// Run-log destination, or the missing setting that prevents one.
    pub artifacts: Result<Arc<dyn ArtifactStore>, ConfigError>,
    /// Held for the duration of a run; one run per process at a time.
    pub run_guard: Arc<tokio::sync::Mutex<()>>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl AppState {
    /// Build a scraper for one run from the shared collaborators.
    pub fn scraper(&self) -> Result<PriceScraper, ConfigError> {
        let artifacts = self.artifacts.clone()?;
        Ok(PriceScraper::new(
            Arc::clone(&self.store),
            Arc::clone(&self.source),
            artifacts,
            self.config.scrape_config(),
        ))
    }
}

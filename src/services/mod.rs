pub mod price_scraper;
pub mod scheduler;

pub use price_scraper::{BatchFetchError, PriceScraper, RunReport, RunStatus, RunSummary};

use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_SEARCH_URL: &str =
    "https://www.heb.com.mx/api/catalog_system/pub/products/search";
const DEFAULT_LOG_BUCKET: &str = "scraper-logs";
const DEFAULT_BATCH_SIZE: i64 = 15;

/// Required setting absent from the environment.
#[derive(Debug, Clone, Error)]
#[error("Missing {0}")]
pub struct ConfigError(pub &'static str);

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Bearer token for the trigger endpoint; auth disabled when unset
    pub api_token: Option<String>,

    // External price source
    pub heb_search_url: String,
    pub heb_seller_id: String,

    // Run log artifacts: either a local directory or an object storage bucket
    pub log_dir: Option<PathBuf>,
    pub storage_url: Option<String>,
    pub storage_service_key: Option<String>,
    pub log_bucket: String,

    // Batch
    pub batch_size: i64,
    pub request_delay_ms: u64,
    pub savings_threshold: Decimal,
    pub scrape_interval_secs: Option<u64>,
}

/// Where run-log artifacts get written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactTarget {
    LocalDir(PathBuf),
    Bucket {
        storage_url: String,
        service_key: String,
        bucket: String,
    },
}

impl ArtifactTarget {
    /// Human-readable destination without credentials.
    pub fn describe(&self) -> String {
        match self {
            ArtifactTarget::LocalDir(dir) => format!("dir:{}", dir.display()),
            ArtifactTarget::Bucket {
                storage_url, bucket, ..
            } => format!("bucket:{storage_url}/{bucket}"),
        }
    }
}

/// Tunables for a single scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub batch_size: i64,
    pub request_delay: Duration,
    pub savings_threshold: Decimal,
    pub seller_id: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_delay: Duration::from_secs(2),
            savings_threshold: Decimal::new(15, 2), // 0.15
            seller_id: "1".into(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            api_token: non_empty_var("API_TOKEN"),

            heb_search_url: env::var("HEB_SEARCH_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_URL.into()),
            heb_seller_id: env::var("HEB_SELLER_ID").unwrap_or_else(|_| "1".into()),

            log_dir: non_empty_var("LOG_DIR").map(PathBuf::from),
            storage_url: non_empty_var("STORAGE_URL"),
            storage_service_key: non_empty_var("STORAGE_SERVICE_KEY"),
            log_bucket: env::var("LOG_BUCKET").unwrap_or_else(|_| DEFAULT_LOG_BUCKET.into()),

            batch_size: parse_batch_size(env::var("SCRAPE_BATCH_SIZE").ok()),
            request_delay_ms: env::var("SCRAPE_DELAY_MS")
                .unwrap_or_else(|_| "2000".into())
                .parse()
                .unwrap_or(2_000),
            savings_threshold: env::var("SAVINGS_THRESHOLD")
                .unwrap_or_else(|_| "0.15".into())
                .parse()
                .unwrap_or(Decimal::new(15, 2)),
            scrape_interval_secs: env::var("SCRAPE_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0),
        })
    }

    /// Resolve the artifact target. A local directory wins over the bucket.
    pub fn artifact_target(&self) -> Result<ArtifactTarget, ConfigError> {
        if let Some(dir) = &self.log_dir {
            return Ok(ArtifactTarget::LocalDir(dir.clone()));
        }

        let storage_url = self.storage_url.clone().ok_or(ConfigError("STORAGE_URL"))?;
        let service_key = self
            .storage_service_key
            .clone()
            .ok_or(ConfigError("STORAGE_SERVICE_KEY"))?;

        Ok(ArtifactTarget::Bucket {
            storage_url,
            service_key,
            bucket: self.log_bucket.clone(),
        })
    }

    pub fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            batch_size: self.batch_size.max(1),
            request_delay: Duration::from_millis(self.request_delay_ms),
            savings_threshold: self.savings_threshold,
            seller_id: self.heb_seller_id.clone(),
        }
    }
}

/// Unparseable and non-positive values fall back to the default.
fn parse_batch_size(raw: Option<String>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ScrapeConfig;
use crate::db::PriceStore;
use crate::heb::extractor::describe_sellers;
use crate::heb::{extract_price, ExtractedPrice, PriceSource, SearchResult};
use crate::models::{CatalogMatch, NewPriceAlert, NewPriceSnapshot, PriceSnapshot, TrackedProduct};
use crate::pricing::{evaluate_savings, savings_fraction};
use crate::run_log::{ArtifactStore, RunLogger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    NoWork,
    Error,
}

/// Counters for one run. Also the `summary` section of the run-log artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub run_id: String,
    pub processed: usize,
    pub matched: usize,
    pub not_found: usize,
    pub alerts_created: usize,
    pub errors: usize,
    pub total_products_in_batch: usize,
    pub duration_ms: u64,
    pub log_folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    fn new(logger: &RunLogger, status: RunStatus, total: usize) -> Self {
        Self {
            status,
            run_id: logger.run_id().to_string(),
            processed: 0,
            matched: 0,
            not_found: 0,
            alerts_created: 0,
            errors: 0,
            total_products_in_batch: total,
            duration_ms: 0,
            log_folder: logger.log_folder(),
            error: None,
        }
    }
}

#[derive(Debug)]
pub enum RunReport {
    /// Nothing was due for a refresh.
    NoWork { run_id: String, log_folder: String },
    Completed(RunSummary),
}

/// The batch could not be loaded; nothing was processed.
#[derive(Debug, Error)]
#[error("failed to fetch products due for scraping: {details}")]
pub struct BatchFetchError {
    pub run_id: String,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlertOutcome {
    NotWarranted,
    Created,
    Failed,
}

#[derive(Debug)]
enum ProductOutcome {
    NotFound,
    Matched { alert: AlertOutcome },
}

/// Sequential scrape over the due batch:
/// 1. Load up to `batch_size` due products
/// 2. Search the catalog (normalized name, then display name)
/// 3. Extract the authoritative in-stock offer
/// 4. Persist match + daily snapshot
/// 5. Insert an alert when savings clear the threshold
///
/// One product at a time, with `request_delay` between products.
pub struct PriceScraper {
    store: Arc<dyn PriceStore>,
    source: Arc<dyn PriceSource>,
    artifacts: Arc<dyn ArtifactStore>,
    config: ScrapeConfig,
}

impl PriceScraper {
    pub fn new(
        store: Arc<dyn PriceStore>,
        source: Arc<dyn PriceSource>,
        artifacts: Arc<dyn ArtifactStore>,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            store,
            source,
            artifacts,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunReport, BatchFetchError> {
        let logger = RunLogger::start();
        self.run_with_logger(&logger).await
    }

    /// Run the batch, recording into `logger`, and flush its artifacts at the end.
    pub async fn run_with_logger(&self, logger: &RunLogger) -> Result<RunReport, BatchFetchError> {
        let started = Instant::now();
        counter!("scrape_runs_total").increment(1);

        logger.info(
            "init",
            "Price scrape run started",
            Some(json!({
                "batch_size": self.config.batch_size,
                "request_delay_ms": self.config.request_delay.as_millis() as u64,
                "savings_threshold": self.config.savings_threshold,
                "seller_id": self.config.seller_id,
            })),
            None,
        );

        let products = match self.store.fetch_due_products(self.config.batch_size).await {
            Ok(p) => p,
            Err(e) => {
                logger.error(
                    "fetch_products",
                    "Failed to fetch products due for scraping",
                    Some(json!({ "error": format!("{e:#}"), "debug": format!("{e:?}") })),
                    None,
                );
                counter!("scrape_errors_total").increment(1);

                let mut summary = RunSummary::new(logger, RunStatus::Error, 0);
                summary.error = Some(e.to_string());
                summary.duration_ms = started.elapsed().as_millis() as u64;
                logger.flush(&summary, self.artifacts.as_ref()).await;

                return Err(BatchFetchError {
                    run_id: logger.run_id().to_string(),
                    details: e.to_string(),
                });
            }
        };

        if products.is_empty() {
            logger.info("fetch_products", "No products due for scraping", None, None);
            let mut summary = RunSummary::new(logger, RunStatus::NoWork, 0);
            summary.duration_ms = started.elapsed().as_millis() as u64;
            logger.flush(&summary, self.artifacts.as_ref()).await;

            return Ok(RunReport::NoWork {
                run_id: logger.run_id().to_string(),
                log_folder: logger.log_folder(),
            });
        }

        let total = products.len();
        logger.info(
            "fetch_products",
            "Loaded products due for scraping",
            Some(json!({
                "count": total,
                "products": products
                    .iter()
                    .map(|p| json!({ "key": p.log_key(), "status": p.match_status, "last_scraped_at": p.last_scraped_at }))
                    .collect::<Vec<_>>(),
            })),
            None,
        );

        let mut summary = RunSummary::new(logger, RunStatus::Completed, total);

        for (idx, product) in products.iter().enumerate() {
            let key = product.log_key();
            summary.processed += 1;
            counter!("products_processed_total").increment(1);

            match self.process_product(product, logger, &key).await {
                Ok(ProductOutcome::NotFound) => {
                    summary.not_found += 1;
                    counter!("products_not_found_total").increment(1);
                }
                Ok(ProductOutcome::Matched { alert }) => {
                    summary.matched += 1;
                    counter!("products_matched_total").increment(1);
                    match alert {
                        AlertOutcome::Created => summary.alerts_created += 1,
                        AlertOutcome::Failed => {
                            summary.errors += 1;
                            counter!("scrape_errors_total").increment(1);
                        }
                        AlertOutcome::NotWarranted => {}
                    }
                }
                Err(e) => {
                    summary.errors += 1;
                    counter!("scrape_errors_total").increment(1);
                    logger.error(
                        "product_error",
                        "Product processing failed",
                        Some(json!({
                            "product_id": product.id,
                            "error": format!("{e:#}"),
                            "debug": format!("{e:?}"),
                        })),
                        Some(&key),
                    );
                }
            }

            // Rate limit against the catalog; nothing to wait for after the last item.
            if idx + 1 < total {
                logger.debug(
                    "rate_limit",
                    "Waiting before next product",
                    Some(json!({ "delay_ms": self.config.request_delay.as_millis() as u64 })),
                    None,
                );
                tokio::time::sleep(self.config.request_delay).await;
            }
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        histogram!("scrape_run_duration_seconds").record(started.elapsed().as_secs_f64());

        logger.info(
            "complete",
            "Price scrape run finished",
            Some(json!({
                "processed": summary.processed,
                "matched": summary.matched,
                "not_found": summary.not_found,
                "alerts_created": summary.alerts_created,
                "errors": summary.errors,
                "duration_ms": summary.duration_ms,
            })),
            None,
        );

        logger.flush(&summary, self.artifacts.as_ref()).await;

        Ok(RunReport::Completed(summary))
    }

    async fn process_product(
        &self,
        product: &TrackedProduct,
        logger: &RunLogger,
        key: &str,
    ) -> anyhow::Result<ProductOutcome> {
        logger.info(
            "product_start",
            "Processing tracked product",
            Some(json!({
                "product_id": product.id,
                "normalized_name": product.normalized_name,
                "display_name": product.display_name,
                "avg_purchase_price": product.avg_purchase_price,
                "match_status": product.match_status,
                "heb_product_id": product.heb_product_id,
            })),
            Some(key),
        );

        let result = self.find_candidate(product, logger, key).await;

        let Some(raw) = result.product else {
            logger.warn(
                "not_found",
                "Search returned no catalog product",
                Some(json!({
                    "last_status": result.status,
                    "failure": result.failure.as_ref().map(|f| f.to_string()),
                })),
                Some(key),
            );
            self.store
                .mark_not_found(product.id, Utc::now())
                .await
                .context("failed to mark product not_found")?;
            return Ok(ProductOutcome::NotFound);
        };

        let Some(extracted) = extract_price(&raw, &self.config.seller_id) else {
            logger.warn(
                "no_valid_seller",
                "Catalog product has no in-stock offer from the authoritative seller",
                Some(json!({
                    "heb_product_id": raw.product_id,
                    "heb_product_name": raw.product_name,
                    "seller_id": self.config.seller_id,
                    "sellers": describe_sellers(&raw),
                })),
                Some(key),
            );
            self.store
                .mark_not_found(product.id, Utc::now())
                .await
                .context("failed to mark product not_found")?;
            return Ok(ProductOutcome::NotFound);
        };

        logger.info(
            "price_extracted",
            "Extracted authoritative offer",
            Some(json!({
                "heb_product_id": raw.product_id,
                "heb_product_name": raw.product_name,
                "offer": extracted,
            })),
            Some(key),
        );

        let now = Utc::now();
        self.store
            .mark_matched(
                product.id,
                &CatalogMatch {
                    heb_product_id: raw.product_id.clone(),
                    heb_product_name: raw.product_name.clone(),
                    heb_ean: extracted.ean.clone(),
                    scraped_at: now,
                },
            )
            .await
            .context("failed to update tracked product match")?;

        let snapshot = self
            .store
            .upsert_snapshot(&NewPriceSnapshot {
                tracked_product_id: product.id,
                user_id: product.user_id,
                price: extracted.price,
                list_price: extracted.list_price,
                is_promotion: extracted.is_promotion,
                promotion_text: promotion_text(&extracted),
                scrape_date: now.date_naive(),
            })
            .await
            .context("failed to upsert price snapshot")?;

        logger.info(
            "snapshot_saved",
            "Price snapshot saved",
            Some(json!({ "snapshot_id": snapshot.id, "scrape_date": snapshot.scrape_date })),
            Some(key),
        );

        let alert = self
            .maybe_create_alert(product, &extracted, &snapshot, logger, key)
            .await;

        Ok(ProductOutcome::Matched { alert })
    }

    /// Resolved products are reconfirmed with one display-name query. Others
    /// try the normalized name first and fall back to the display name once.
    async fn find_candidate(
        &self,
        product: &TrackedProduct,
        logger: &RunLogger,
        key: &str,
    ) -> SearchResult {
        if product.is_resolved() {
            logger.debug(
                "search_strategy",
                "Reconfirming matched product by display name",
                Some(json!({ "query": product.display_name })),
                Some(key),
            );
            return self.source.search(&product.display_name, logger, key).await;
        }

        let primary = self
            .source
            .search(&product.normalized_name, logger, key)
            .await;
        if primary.product.is_some() {
            return primary;
        }

        logger.info(
            "search_fallback",
            "No candidate for normalized name, retrying with display name",
            Some(json!({
                "normalized_name": product.normalized_name,
                "display_name": product.display_name,
            })),
            Some(key),
        );
        self.source.search(&product.display_name, logger, key).await
    }

    async fn maybe_create_alert(
        &self,
        product: &TrackedProduct,
        extracted: &ExtractedPrice,
        snapshot: &PriceSnapshot,
        logger: &RunLogger,
        key: &str,
    ) -> AlertOutcome {
        let fraction = savings_fraction(product.avg_purchase_price, extracted.price);
        logger.debug(
            "savings",
            "Compared catalog price with purchase average",
            Some(json!({
                "avg_purchase_price": product.avg_purchase_price,
                "heb_price": extracted.price,
                "savings_fraction": fraction.round_dp(4),
                "threshold": self.config.savings_threshold,
            })),
            Some(key),
        );

        let Some(decision) = evaluate_savings(
            product.avg_purchase_price,
            extracted.price,
            extracted.is_promotion,
            self.config.savings_threshold,
        ) else {
            return AlertOutcome::NotWarranted;
        };

        let alert = NewPriceAlert {
            user_id: product.user_id,
            tracked_product_id: product.id,
            snapshot_id: snapshot.id,
            alert_type: decision.alert_type,
            heb_price: extracted.price,
            user_avg_price: product.avg_purchase_price,
            savings_percent: decision.savings_percent,
            savings_amount: decision.savings_amount,
        };

        match self.store.insert_alert(&alert).await {
            Ok(row) => {
                counter!("price_alerts_created_total").increment(1);
                logger.info(
                    "alert_created",
                    "Price alert created",
                    Some(json!({
                        "alert_id": row.id,
                        "alert_type": decision.alert_type,
                        "savings_percent": decision.savings_percent,
                        "savings_amount": decision.savings_amount,
                    })),
                    Some(key),
                );
                AlertOutcome::Created
            }
            Err(e) => {
                logger.error(
                    "alert_failed",
                    "Failed to insert price alert",
                    Some(json!({ "error": format!("{e:#}"), "debug": format!("{e:?}") })),
                    Some(key),
                );
                AlertOutcome::Failed
            }
        }
    }
}

fn promotion_text(extracted: &ExtractedPrice) -> Option<String> {
    extracted
        .is_promotion
        .then(|| format!("Regular price {}", extracted.list_price.round_dp(2)))
}

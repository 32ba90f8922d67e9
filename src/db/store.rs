use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{alert_repo, product_repo, snapshot_repo};
use crate::models::{
    CatalogMatch, NewPriceAlert, NewPriceSnapshot, PriceAlert, PriceSnapshot, TrackedProduct,
};

/// System of record the scrape job reads from and writes to.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Active `pending`/`matched` products, least recently scraped first.
    async fn fetch_due_products(&self, limit: i64) -> anyhow::Result<Vec<TrackedProduct>>;

    async fn mark_not_found(&self, id: Uuid, scraped_at: DateTime<Utc>) -> anyhow::Result<()>;

    async fn mark_matched(&self, id: Uuid, m: &CatalogMatch) -> anyhow::Result<()>;

    /// Upsert keyed by (tracked_product_id, scrape_date).
    async fn upsert_snapshot(&self, snapshot: &NewPriceSnapshot) -> anyhow::Result<PriceSnapshot>;

    async fn insert_alert(&self, alert: &NewPriceAlert) -> anyhow::Result<PriceAlert>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Postgres-backed store.
#[derive(Debug, Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PriceStore for PgPriceStore {
    async fn fetch_due_products(&self, limit: i64) -> anyhow::Result<Vec<TrackedProduct>> {
        product_repo::get_due_products(&self.pool, limit).await
    }

    async fn mark_not_found(&self, id: Uuid, scraped_at: DateTime<Utc>) -> anyhow::Result<()> {
        product_repo::mark_not_found(&self.pool, id, scraped_at).await
    }

    async fn mark_matched(&self, id: Uuid, m: &CatalogMatch) -> anyhow::Result<()> {
        product_repo::mark_matched(&self.pool, id, m).await
    }

    async fn upsert_snapshot(&self, snapshot: &NewPriceSnapshot) -> anyhow::Result<PriceSnapshot> {
        snapshot_repo::upsert_snapshot(&self.pool, snapshot).await
    }

    async fn insert_alert(&self, alert: &NewPriceAlert) -> anyhow::Result<PriceAlert> {
        alert_repo::insert_alert(&self.pool, alert).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

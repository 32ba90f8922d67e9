use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for price_snapshots table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceSnapshot {
    pub id: Uuid,
    pub tracked_product_id: Uuid,
    pub user_id: Uuid,
    pub price: Decimal,
    pub list_price: Decimal,
    pub is_promotion: bool,
    pub promotion_text: Option<String>,
    pub scrape_date: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
}

/// Snapshot to upsert, keyed by (tracked_product_id, scrape_date).
#[derive(Debug, Clone)]
pub struct NewPriceSnapshot {
    pub tracked_product_id: Uuid,
    pub user_id: Uuid,
    pub price: Decimal,
    pub list_price: Decimal,
    pub is_promotion: bool,
    pub promotion_text: Option<String>,
    pub scrape_date: NaiveDate,
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::MatchStatus;

/// Database row for tracked_products table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrackedProduct {
    pub id: Uuid,
    pub user_id: Uuid,
    pub normalized_name: String,
    pub display_name: String,
    pub avg_purchase_price: Decimal,
    pub heb_product_id: Option<String>,
    pub heb_product_name: Option<String>,
    pub heb_ean: Option<String>,
    pub match_status: String,
    pub is_active: bool,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

impl TrackedProduct {
    /// Parsed match status. Unknown values are treated as `pending`.
    pub fn status(&self) -> MatchStatus {
        MatchStatus::from_db_str(&self.match_status).unwrap_or(MatchStatus::Pending)
    }

    /// True when a previous run already resolved this product on the catalog.
    pub fn is_resolved(&self) -> bool {
        self.status() == MatchStatus::Matched && self.heb_product_id.is_some()
    }

    /// Key used to group run-log entries for this product.
    pub fn log_key(&self) -> String {
        let id = self.id.simple().to_string();
        format!("{}_{}", self.normalized_name, &id[..8])
    }
}

/// Catalog match written back after a successful extraction.
#[derive(Debug, Clone)]
pub struct CatalogMatch {
    pub heb_product_id: String,
    pub heb_product_name: String,
    pub heb_ean: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

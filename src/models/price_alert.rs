use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::AlertType;

/// Database row for price_alerts table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PriceAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tracked_product_id: Uuid,
    pub snapshot_id: Uuid,
    pub alert_type: String,
    pub heb_price: Decimal,
    pub user_avg_price: Decimal,
    pub savings_percent: i32,
    pub savings_amount: Decimal,
    pub is_read: bool,
    pub is_dismissed: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewPriceAlert {
    pub user_id: Uuid,
    pub tracked_product_id: Uuid,
    pub snapshot_id: Uuid,
    pub alert_type: AlertType,
    pub heb_price: Decimal,
    pub user_avg_price: Decimal,
    pub savings_percent: i32,
    pub savings_amount: Decimal,
}

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewPriceAlert, PriceAlert};

pub async fn insert_alert(pool: &PgPool, alert: &NewPriceAlert) -> anyhow::Result<PriceAlert> {
    let row = sqlx::query_as::<_, PriceAlert>(
        r#"
        INSERT INTO price_alerts
            (user_id, tracked_product_id, snapshot_id, alert_type,
             heb_price, user_avg_price, savings_percent, savings_amount)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(alert.user_id)
    .bind(alert.tracked_product_id)
    .bind(alert.snapshot_id)
    .bind(alert.alert_type.as_str())
    .bind(alert.heb_price)
    .bind(alert.user_avg_price)
    .bind(alert.savings_percent)
    .bind(alert.savings_amount)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Alerts for a user, newest first. Dismissed alerts are excluded.
pub async fn get_alerts_for_user(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PriceAlert>> {
    let rows = sqlx::query_as::<_, PriceAlert>(
        r#"
        SELECT * FROM price_alerts
        WHERE user_id = $1 AND is_dismissed = false
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

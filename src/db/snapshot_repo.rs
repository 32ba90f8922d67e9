use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewPriceSnapshot, PriceSnapshot};

/// Insert today's snapshot, or overwrite the one already taken today.
pub async fn upsert_snapshot(
    pool: &PgPool,
    snapshot: &NewPriceSnapshot,
) -> anyhow::Result<PriceSnapshot> {
    let row = sqlx::query_as::<_, PriceSnapshot>(
        r#"
        INSERT INTO price_snapshots
            (tracked_product_id, user_id, price, list_price, is_promotion, promotion_text, scrape_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (tracked_product_id, scrape_date) DO UPDATE
        SET price = EXCLUDED.price,
            list_price = EXCLUDED.list_price,
            is_promotion = EXCLUDED.is_promotion,
            promotion_text = EXCLUDED.promotion_text
        RETURNING *
        "#,
    )
    .bind(snapshot.tracked_product_id)
    .bind(snapshot.user_id)
    .bind(snapshot.price)
    .bind(snapshot.list_price)
    .bind(snapshot.is_promotion)
    .bind(snapshot.promotion_text.as_deref())
    .bind(snapshot.scrape_date)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

pub async fn get_snapshots_for_product(
    pool: &PgPool,
    tracked_product_id: Uuid,
) -> anyhow::Result<Vec<PriceSnapshot>> {
    let rows = sqlx::query_as::<_, PriceSnapshot>(
        "SELECT * FROM price_snapshots WHERE tracked_product_id = $1 ORDER BY scrape_date DESC",
    )
    .bind(tracked_product_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn get_snapshot(
    pool: &PgPool,
    tracked_product_id: Uuid,
    scrape_date: NaiveDate,
) -> anyhow::Result<Option<PriceSnapshot>> {
    let row = sqlx::query_as::<_, PriceSnapshot>(
        "SELECT * FROM price_snapshots WHERE tracked_product_id = $1 AND scrape_date = $2",
    )
    .bind(tracked_product_id)
    .bind(scrape_date)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

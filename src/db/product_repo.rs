use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CatalogMatch, MatchStatus, TrackedProduct};

/// Active products due for a price refresh, least recently scraped first.
pub async fn get_due_products(pool: &PgPool, limit: i64) -> anyhow::Result<Vec<TrackedProduct>> {
    let due: Vec<&str> = MatchStatus::DUE.iter().map(|s| s.as_str()).collect();

    let rows = sqlx::query_as::<_, TrackedProduct>(
        r#"
        SELECT id, user_id, normalized_name, display_name, avg_purchase_price,
               heb_product_id, heb_product_name, heb_ean, match_status,
               is_active, last_scraped_at
        FROM tracked_products
        WHERE is_active = true AND match_status = ANY($1)
        ORDER BY last_scraped_at ASC NULLS FIRST
        LIMIT $2
        "#,
    )
    .bind(due)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Record that the catalog has no usable offer for this product.
pub async fn mark_not_found(
    pool: &PgPool,
    id: Uuid,
    scraped_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE tracked_products
        SET match_status = $2, last_scraped_at = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(MatchStatus::NotFound.as_str())
    .bind(scraped_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Store the resolved catalog identity and flip the product to `matched`.
pub async fn mark_matched(pool: &PgPool, id: Uuid, m: &CatalogMatch) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE tracked_products
        SET heb_product_id = $2,
            heb_product_name = $3,
            heb_ean = $4,
            match_status = $5,
            last_scraped_at = $6,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&m.heb_product_id)
    .bind(&m.heb_product_name)
    .bind(m.heb_ean.as_deref())
    .bind(MatchStatus::Matched.as_str())
    .bind(m.scraped_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_product(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<TrackedProduct>> {
    let row = sqlx::query_as::<_, TrackedProduct>(
        r#"
        SELECT id, user_id, normalized_name, display_name, avg_purchase_price,
               heb_product_id, heb_product_name, heb_ean, match_status,
               is_active, last_scraped_at
        FROM tracked_products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use pricewatch::heb::{
    CommercialOffer, PriceSource, RawItem, RawProduct, RawSeller, SearchFailure, SearchResult,
};
use pricewatch::models::{MatchStatus, TrackedProduct};
use pricewatch::run_log::RunLogger;

/// Connect to the test database and run all migrations.
/// Returns `None` when `TEST_DATABASE_URL` is not set so DB suites can skip.
#[allow(dead_code)]
pub async fn setup_test_db() -> Option<PgPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    pricewatch::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

/// Seed a tracked product row. Names are suffixed so tests never collide.
#[allow(dead_code)]
pub async fn seed_product(
    pool: &PgPool,
    name: &str,
    avg_purchase_price: Decimal,
    status: MatchStatus,
    last_scraped_at: Option<DateTime<Utc>>,
) -> TrackedProduct {
    sqlx::query_as::<_, TrackedProduct>(
        r#"
        INSERT INTO tracked_products
            (user_id, normalized_name, display_name, avg_purchase_price, match_status, last_scraped_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, normalized_name, display_name, avg_purchase_price,
                  heb_product_id, heb_product_name, heb_ean, match_status,
                  is_active, last_scraped_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(format!("{name} {}", Uuid::new_v4().simple()))
    .bind(name)
    .bind(avg_purchase_price)
    .bind(status.as_str())
    .bind(last_scraped_at)
    .fetch_one(pool)
    .await
    .expect("Failed to seed tracked product")
}

/// In-memory tracked product.
#[allow(dead_code)]
pub fn tracked(normalized: &str, display: &str, avg: Decimal, status: MatchStatus) -> TrackedProduct {
    TrackedProduct {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        normalized_name: normalized.into(),
        display_name: display.into(),
        avg_purchase_price: avg,
        heb_product_id: None,
        heb_product_name: None,
        heb_ean: None,
        match_status: status.as_str().into(),
        is_active: true,
        last_scraped_at: None,
    }
}

/// Catalog product with one SKU; sellers are `(seller_id, price, list_price, qty)`.
#[allow(dead_code)]
pub fn raw_product(id: &str, name: &str, sellers: &[(&str, Decimal, Decimal, i64)]) -> RawProduct {
    RawProduct {
        product_id: id.into(),
        product_name: name.into(),
        brand: Some("HEB".into()),
        link: None,
        items: vec![RawItem {
            item_id: format!("{id}-sku"),
            ean: Some(format!("750{id}")),
            sellers: sellers
                .iter()
                .map(|(seller_id, price, list_price, qty)| RawSeller {
                    seller_id: (*seller_id).into(),
                    seller_name: None,
                    commercial_offer: Some(CommercialOffer {
                        price: *price,
                        list_price: *list_price,
                        available_quantity: Decimal::from(*qty),
                    }),
                })
                .collect(),
        }],
    }
}

/// Canned price source. Unknown queries return an empty result set.
#[derive(Default)]
pub struct StubPriceSource {
    responses: HashMap<String, Result<Vec<RawProduct>, u16>>,
    queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl StubPriceSource {
    pub fn with(mut self, query: &str, products: Vec<RawProduct>) -> Self {
        self.responses.insert(query.into(), Ok(products));
        self
    }

    pub fn failing(mut self, query: &str, status: u16) -> Self {
        self.responses.insert(query.into(), Err(status));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for StubPriceSource {
    async fn search(&self, query: &str, logger: &RunLogger, product_key: &str) -> SearchResult {
        self.queries.lock().unwrap().push(query.to_string());
        logger.debug("search_request", "stub search", None, Some(product_key));

        match self.responses.get(query) {
            Some(Ok(products)) => SearchResult {
                product: products.first().cloned(),
                all_products: products.clone(),
                status: 200,
                failure: None,
            },
            Some(Err(status)) => SearchResult {
                product: None,
                all_products: Vec::new(),
                status: *status,
                failure: Some(SearchFailure::HttpStatus(*status)),
            },
            None => SearchResult {
                status: 200,
                ..SearchResult::default()
            },
        }
    }
}

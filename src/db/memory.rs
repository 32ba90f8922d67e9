use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::PriceStore;
use crate::models::{
    CatalogMatch, MatchStatus, NewPriceAlert, NewPriceSnapshot, PriceAlert, PriceSnapshot,
    TrackedProduct,
};

#[derive(Default)]
struct Tables {
    products: Vec<TrackedProduct>,
    snapshots: Vec<PriceSnapshot>,
    alerts: Vec<PriceAlert>,
}

/// In-process store with the same semantics as the Postgres tables. Used by
/// tests, with switches to make individual writes fail.
#[derive(Default)]
pub struct MemoryPriceStore {
    tables: Mutex<Tables>,
    fail_due_fetch: Mutex<bool>,
    fail_snapshot_for: Mutex<HashSet<Uuid>>,
    fail_alerts: Mutex<bool>,
}

impl MemoryPriceStore {
    pub fn new(products: Vec<TrackedProduct>) -> Self {
        let store = Self::default();
        store.tables().products = products;
        store
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn fail_due_fetch(&self) {
        *lock(&self.fail_due_fetch) = true;
    }

    pub fn fail_snapshots_for(&self, product_id: Uuid) {
        lock(&self.fail_snapshot_for).insert(product_id);
    }

    pub fn fail_alerts(&self) {
        *lock(&self.fail_alerts) = true;
    }

    pub fn product(&self, id: Uuid) -> Option<TrackedProduct> {
        self.tables().products.iter().find(|p| p.id == id).cloned()
    }

    pub fn snapshots(&self) -> Vec<PriceSnapshot> {
        self.tables().snapshots.clone()
    }

    pub fn alerts(&self) -> Vec<PriceAlert> {
        self.tables().alerts.clone()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn fetch_due_products(&self, limit: i64) -> anyhow::Result<Vec<TrackedProduct>> {
        if *lock(&self.fail_due_fetch) {
            anyhow::bail!("connection refused");
        }

        let mut due: Vec<TrackedProduct> = self
            .tables()
            .products
            .iter()
            .filter(|p| p.is_active && p.status().is_due())
            .cloned()
            .collect();

        // None sorts before Some: nulls first.
        due.sort_by_key(|p| p.last_scraped_at);
        due.truncate(limit.max(0) as usize);
        Ok(due)
    }

    async fn mark_not_found(&self, id: Uuid, scraped_at: DateTime<Utc>) -> anyhow::Result<()> {
        let mut tables = self.tables();
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow::anyhow!("tracked product {id} not found"))?;
        product.match_status = MatchStatus::NotFound.as_str().into();
        product.last_scraped_at = Some(scraped_at);
        Ok(())
    }

    async fn mark_matched(&self, id: Uuid, m: &CatalogMatch) -> anyhow::Result<()> {
        let mut tables = self.tables();
        let product = tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| anyhow::anyhow!("tracked product {id} not found"))?;
        product.heb_product_id = Some(m.heb_product_id.clone());
        product.heb_product_name = Some(m.heb_product_name.clone());
        product.heb_ean = m.heb_ean.clone();
        product.match_status = MatchStatus::Matched.as_str().into();
        product.last_scraped_at = Some(m.scraped_at);
        Ok(())
    }

    async fn upsert_snapshot(&self, snapshot: &NewPriceSnapshot) -> anyhow::Result<PriceSnapshot> {
        if lock(&self.fail_snapshot_for).contains(&snapshot.tracked_product_id) {
            anyhow::bail!("duplicate key value violates unique constraint");
        }

        let mut tables = self.tables();
        if let Some(existing) = tables.snapshots.iter_mut().find(|s| {
            s.tracked_product_id == snapshot.tracked_product_id
                && s.scrape_date == snapshot.scrape_date
        }) {
            existing.price = snapshot.price;
            existing.list_price = snapshot.list_price;
            existing.is_promotion = snapshot.is_promotion;
            existing.promotion_text = snapshot.promotion_text.clone();
            return Ok(existing.clone());
        }

        let row = PriceSnapshot {
            id: Uuid::new_v4(),
            tracked_product_id: snapshot.tracked_product_id,
            user_id: snapshot.user_id,
            price: snapshot.price,
            list_price: snapshot.list_price,
            is_promotion: snapshot.is_promotion,
            promotion_text: snapshot.promotion_text.clone(),
            scrape_date: snapshot.scrape_date,
            created_at: Some(Utc::now()),
        };
        tables.snapshots.push(row.clone());
        Ok(row)
    }

    async fn insert_alert(&self, alert: &NewPriceAlert) -> anyhow::Result<PriceAlert> {
        if *lock(&self.fail_alerts) {
            anyhow::bail!("insert into price_alerts failed");
        }

        let row = PriceAlert {
            id: Uuid::new_v4(),
            user_id: alert.user_id,
            tracked_product_id: alert.tracked_product_id,
            snapshot_id: alert.snapshot_id,
            alert_type: alert.alert_type.as_str().into(),
            heb_price: alert.heb_price,
            user_avg_price: alert.user_avg_price,
            savings_percent: alert.savings_percent,
            savings_amount: alert.savings_amount,
            is_read: false,
            is_dismissed: false,
            created_at: Some(Utc::now()),
        };
        self.tables().alerts.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn product(name: &str, status: MatchStatus, last: Option<DateTime<Utc>>) -> TrackedProduct {
        TrackedProduct {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            normalized_name: name.into(),
            display_name: name.into(),
            avg_purchase_price: Decimal::from(10),
            heb_product_id: None,
            heb_product_name: None,
            heb_ean: None,
            match_status: status.as_str().into(),
            is_active: true,
            last_scraped_at: last,
        }
    }

    #[tokio::test]
    async fn test_due_selection_order_and_filter() {
        let now = Utc::now();
        let mut inactive = product("inactive", MatchStatus::Pending, None);
        inactive.is_active = false;

        let store = MemoryPriceStore::new(vec![
            product("recent", MatchStatus::Matched, Some(now)),
            product("old", MatchStatus::Pending, Some(now - Duration::days(3))),
            product("never", MatchStatus::Pending, None),
            product("missing", MatchStatus::NotFound, None),
            product("unsure", MatchStatus::Ambiguous, None),
            inactive,
        ]);

        let due = store.fetch_due_products(15).await.unwrap();
        let names: Vec<&str> = due.iter().map(|p| p.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["never", "old", "recent"]);

        let capped = store.fetch_due_products(2).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_upsert_keeps_one_row_per_day() {
        let p = product("milk", MatchStatus::Pending, None);
        let store = MemoryPriceStore::new(vec![p.clone()]);
        let today = Utc::now().date_naive();

        let mut snap = NewPriceSnapshot {
            tracked_product_id: p.id,
            user_id: p.user_id,
            price: Decimal::from(10),
            list_price: Decimal::from(12),
            is_promotion: true,
            promotion_text: None,
            scrape_date: today,
        };
        let first = store.upsert_snapshot(&snap).await.unwrap();

        snap.price = Decimal::from(11);
        snap.is_promotion = false;
        let second = store.upsert_snapshot(&snap).await.unwrap();

        assert_eq!(first.id, second.id);
        let rows = store.snapshots();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, Decimal::from(11));
        assert!(!rows[0].is_promotion);
    }
}

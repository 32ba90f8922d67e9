use rust_decimal::Decimal;
use serde::Serialize;

use super::types::RawProduct;

/// Seller id of the retailer's own storefront on the marketplace.
pub const AUTHORITATIVE_SELLER_ID: &str = "1";

/// Offer picked from a product record.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedPrice {
    pub price: Decimal,
    pub list_price: Decimal,
    pub ean: Option<String>,
    pub is_promotion: bool,
    pub seller_details: SellerDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerDetails {
    pub seller_id: String,
    pub seller_name: Option<String>,
    pub item_id: String,
    pub available_quantity: Decimal,
}

/// Find the first in-stock offer from `seller_id`, scanning SKUs and sellers
/// in response order. This is not a lowest-price search: when several SKUs
/// qualify, the first one wins.
pub fn extract_price(product: &RawProduct, seller_id: &str) -> Option<ExtractedPrice> {
    for item in &product.items {
        for seller in &item.sellers {
            if seller.seller_id != seller_id {
                continue;
            }
            let Some(offer) = &seller.commercial_offer else {
                continue;
            };
            if offer.available_quantity <= Decimal::ZERO || offer.price <= Decimal::ZERO {
                continue;
            }

            return Some(ExtractedPrice {
                price: offer.price,
                list_price: offer.list_price,
                ean: item.ean.clone(),
                is_promotion: offer.list_price > offer.price,
                seller_details: SellerDetails {
                    seller_id: seller.seller_id.clone(),
                    seller_name: seller.seller_name.clone(),
                    item_id: item.item_id.clone(),
                    available_quantity: offer.available_quantity,
                },
            });
        }
    }

    None
}

/// Summary of every seller on a product, used when extraction comes up empty.
pub fn describe_sellers(product: &RawProduct) -> Vec<serde_json::Value> {
    product
        .items
        .iter()
        .flat_map(|item| {
            item.sellers.iter().map(move |seller| {
                let offer = seller.commercial_offer.as_ref();
                serde_json::json!({
                    "item_id": item.item_id,
                    "seller_id": seller.seller_id,
                    "price": offer.map(|o| o.price),
                    "available_quantity": offer.map(|o| o.available_quantity),
                })
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

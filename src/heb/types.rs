use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product record as returned by the catalog search endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub product_id: String,
    pub product_name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

/// One SKU of a product.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub item_id: String,
    #[serde(default)]
    pub ean: Option<String>,
    #[serde(default)]
    pub sellers: Vec<RawSeller>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSeller {
    pub seller_id: String,
    #[serde(default)]
    pub seller_name: Option<String>,
    /// The upstream API spells this key `commertialOffer`.
    #[serde(default, rename = "commertialOffer")]
    pub commercial_offer: Option<CommercialOffer>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommercialOffer {
    #[serde(rename = "Price")]
    pub price: Decimal,
    #[serde(rename = "ListPrice")]
    pub list_price: Decimal,
    #[serde(rename = "AvailableQuantity", default)]
    pub available_quantity: Decimal,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of products, got {0}")]
    NotAnArray(&'static str),
}

/// Search body after shape validation.
#[derive(Debug, Clone, Default)]
pub struct ParsedSearch {
    pub products: Vec<RawProduct>,
    /// Validation errors for elements that did not match the product shape.
    pub rejected: Vec<String>,
}

/// Validate a search response body. The body must be an array; each element
/// is checked against the product shape on its own so one malformed record
/// does not hide the others.
pub fn parse_search_body(body: &[u8]) -> Result<ParsedSearch, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;

    let elements = match value {
        serde_json::Value::Array(elements) => elements,
        serde_json::Value::Object(_) => return Err(ParseError::NotAnArray("object")),
        serde_json::Value::Null => return Err(ParseError::NotAnArray("null")),
        serde_json::Value::String(_) => return Err(ParseError::NotAnArray("string")),
        serde_json::Value::Number(_) => return Err(ParseError::NotAnArray("number")),
        serde_json::Value::Bool(_) => return Err(ParseError::NotAnArray("bool")),
    };

    let mut parsed = ParsedSearch::default();
    for (idx, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<RawProduct>(element) {
            Ok(product) => parsed.products.push(product),
            Err(e) => parsed.rejected.push(format!("element {idx}: {e}")),
        }
    }

    Ok(parsed)
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

use super::types::{parse_search_body, ParseError, RawProduct};
use crate::run_log::RunLogger;

/// Result window: `_from=0&_to=2` returns the top three hits.
const RESULT_WINDOW_END: &str = "2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = "Mozilla/5.0 (compatible; pricewatch/0.1)";

/// Why a search produced no candidates. None of these abort the run.
#[derive(Debug, Error)]
pub enum SearchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("search returned HTTP {0}")]
    HttpStatus(u16),

    #[error("unparseable response: {0}")]
    Parse(#[from] ParseError),
}

/// Outcome of one search query. `product` is `None` on empty results and on
/// every failure mode.
#[derive(Debug, Default)]
pub struct SearchResult {
    pub product: Option<RawProduct>,
    pub all_products: Vec<RawProduct>,
    /// HTTP status, or 0 when no response arrived.
    pub status: u16,
    pub failure: Option<SearchFailure>,
}

impl SearchResult {
    fn failed(status: u16, failure: SearchFailure) -> Self {
        Self {
            product: None,
            all_products: Vec::new(),
            status,
            failure: Some(failure),
        }
    }
}

/// Source of external catalog prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn search(&self, query: &str, logger: &RunLogger, product_key: &str) -> SearchResult;
}

#[derive(Debug, Clone)]
pub struct HebSearchClient {
    http: Client,
    search_url: String,
}

impl HebSearchClient {
    pub fn new(search_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(http, search_url))
    }

    pub fn with_client(http: Client, search_url: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
        }
    }
}

#[async_trait]
impl PriceSource for HebSearchClient {
    async fn search(&self, query: &str, logger: &RunLogger, product_key: &str) -> SearchResult {
        let key = Some(product_key);
        logger.debug(
            "search_request",
            "Querying catalog search",
            Some(json!({ "query": query, "url": self.search_url })),
            key,
        );

        let resp = match self
            .http
            .get(&self.search_url)
            .query(&[
                ("ft", query),
                ("_from", "0"),
                ("_to", RESULT_WINDOW_END),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                logger.warn(
                    "search_network_error",
                    "Catalog search request failed",
                    Some(json!({ "query": query, "error": e.to_string() })),
                    key,
                );
                return SearchResult::failed(0, SearchFailure::Network(e.to_string()));
            }
        };

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            logger.warn(
                "search_http_error",
                "Catalog search returned non-2xx status",
                Some(json!({ "query": query, "status": status })),
                key,
            );
            return SearchResult::failed(status, SearchFailure::HttpStatus(status));
        }

        let body = match resp.bytes().await {
            Ok(b) => b,
            Err(e) => {
                logger.warn(
                    "search_network_error",
                    "Failed to read catalog search body",
                    Some(json!({ "query": query, "error": e.to_string() })),
                    key,
                );
                return SearchResult::failed(status, SearchFailure::Network(e.to_string()));
            }
        };

        let parsed = match parse_search_body(&body) {
            Ok(p) => p,
            Err(e) => {
                let preview: String = String::from_utf8_lossy(&body).chars().take(200).collect();
                logger.warn(
                    "search_parse_error",
                    "Catalog search body is not a product list",
                    Some(json!({ "query": query, "error": e.to_string(), "body_preview": preview })),
                    key,
                );
                return SearchResult::failed(status, SearchFailure::Parse(e));
            }
        };

        if !parsed.rejected.is_empty() {
            logger.warn(
                "search_shape_mismatch",
                "Dropped search results that do not match the product shape",
                Some(json!({ "query": query, "rejected": parsed.rejected })),
                key,
            );
        }

        logger.info(
            "search_response",
            "Catalog search completed",
            Some(json!({
                "query": query,
                "status": status,
                "result_count": parsed.products.len(),
                "candidates": parsed
                    .products
                    .iter()
                    .map(|p| json!({ "product_id": p.product_id, "name": p.product_name, "brand": p.brand }))
                    .collect::<Vec<_>>(),
            })),
            key,
        );

        SearchResult {
            product: parsed.products.first().cloned(),
            all_products: parsed.products,
            status,
            failure: None,
        }
    }
}

pub mod extractor;
pub mod search_client;
pub mod types;

pub use extractor::{extract_price, ExtractedPrice, SellerDetails, AUTHORITATIVE_SELLER_ID};
pub use search_client::{HebSearchClient, PriceSource, SearchFailure, SearchResult};
pub use types::{CommercialOffer, RawItem, RawProduct, RawSeller};

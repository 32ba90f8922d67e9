pub mod price_alert;
pub mod price_snapshot;
pub mod tracked_product;

pub use price_alert::{NewPriceAlert, PriceAlert};
pub use price_snapshot::{NewPriceSnapshot, PriceSnapshot};
pub use tracked_product::{CatalogMatch, TrackedProduct};

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// MatchStatus
// ---------------------------------------------------------------------------

/// Reconciliation stage of a tracked product against the external catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Matched,
    NotFound,
    Ambiguous,
}

impl MatchStatus {
    /// Statuses picked up by the scheduled scrape.
    pub const DUE: [MatchStatus; 2] = [MatchStatus::Pending, MatchStatus::Matched];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Matched => "matched",
            MatchStatus::NotFound => "not_found",
            MatchStatus::Ambiguous => "ambiguous",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MatchStatus::Pending),
            "matched" => Some(MatchStatus::Matched),
            "not_found" => Some(MatchStatus::NotFound),
            "ambiguous" => Some(MatchStatus::Ambiguous),
            _ => None,
        }
    }

    pub fn is_due(&self) -> bool {
        Self::DUE.contains(self)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AlertType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceDrop,
    Promotion,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceDrop => "price_drop",
            AlertType::Promotion => "promotion",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

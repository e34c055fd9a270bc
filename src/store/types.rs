//! Price store record types.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::catalog::ItemId;
use crate::marketplace::MarketplaceId;

/// One observed price for an item on one marketplace.
///
/// Prices are integer minor units of the settlement currency; records are
/// replaced by newer observations, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Canonical item key.
    pub item_id: ItemId,
    /// Marketplace the price was observed on.
    pub marketplace: MarketplaceId,
    /// Lowest listed price, minor currency units.
    pub price: i64,
    /// Settlement currency code.
    pub currency: String,
    /// When the observation was made.
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
    /// Units available at this price. Zero means nothing to buy.
    pub listing_count: u32,
    /// Marketplace listing reference, if the adapter provided one.
    pub source_listing_ref: Option<String>,
}

impl PriceRecord {
    /// Age of this observation at `now`.
    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        now - self.observed_at
    }
}

/// What an upsert did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Record became the new latest and was appended to history.
    Applied,
    /// Identical (item, marketplace, observed_at) already stored; replay
    /// of the same poll, dropped to keep history duplicate-free.
    DuplicateIgnored,
    /// Record was older than the stored latest; late arrival, discarded.
    StaleDiscarded,
}

/// Poll health for one marketplace, surfaced to the dashboard so a human
/// can judge confidence in an opportunity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MarketplaceHealth {
    /// Last successful poll completion.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success: Option<OffsetDateTime>,
    /// Last failed poll.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_failure: Option<OffsetDateTime>,
    /// Error text of the last failure.
    pub last_error: Option<String>,
    /// Failures since the last success.
    pub consecutive_failures: u32,
}

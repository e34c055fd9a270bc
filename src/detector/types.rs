//! Arbitrage opportunity types.

use serde::Serialize;
use time::OffsetDateTime;

use crate::catalog::ItemId;
use crate::marketplace::MarketplaceId;

/// Identity of an opportunity for dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpportunityKey {
    /// Canonical item.
    pub item_id: ItemId,
    /// Marketplace to buy on.
    pub buy_marketplace: MarketplaceId,
    /// Marketplace to sell on.
    pub sell_marketplace: MarketplaceId,
}

/// A currently-observable cross-marketplace spread, net of sale fees.
///
/// Recomputed from scratch each detection pass; never persisted as a
/// mutable entity.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    /// Canonical item.
    pub item_id: ItemId,
    /// Marketplace to buy on.
    pub buy_marketplace: MarketplaceId,
    /// Marketplace to sell on.
    pub sell_marketplace: MarketplaceId,
    /// Buy price, minor units.
    pub buy_price: i64,
    /// Listed sell price, minor units (before fees).
    pub sell_price: i64,
    /// Net profit after the sell marketplace's fees, minor units.
    pub net_profit: i64,
    /// Net profit as basis points of the buy price (informational).
    pub net_profit_bps: u32,
    /// When this pass detected the spread.
    #[serde(with = "time::serde::rfc3339")]
    pub detected_at: OffsetDateTime,
    /// Age of the older of the two input records, seconds.
    pub input_staleness_secs: u64,
}

impl Opportunity {
    /// The dedup identity of this opportunity.
    pub fn key(&self) -> OpportunityKey {
        OpportunityKey {
            item_id: self.item_id.clone(),
            buy_marketplace: self.buy_marketplace,
            sell_marketplace: self.sell_marketplace,
        }
    }
}

//! Marketplace fee models.
//!
//! All arithmetic is on integer minor currency units. The percentage
//! component rounds up, so net proceeds round down and a marginal spread
//! is never overstated.

use serde::{Deserialize, Serialize};

use crate::marketplace::MarketplaceId;

/// Sale fee deducted by a marketplace from sale proceeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeModel {
    /// Fixed fee per sale, minor units.
    pub flat_fee: i64,
    /// Percentage fee in basis points (1500 = 15%).
    pub percentage_bps: u32,
    /// Minimum total fee per sale, minor units.
    pub min_fee: i64,
}

impl FeeModel {
    /// Build a fee model from its parts.
    pub fn new(flat_fee: i64, percentage_bps: u32, min_fee: i64) -> Self {
        Self {
            flat_fee,
            percentage_bps,
            min_fee,
        }
    }

    /// Built-in fee model per marketplace. Operational configuration may
    /// override the percentage; these are published-rate defaults.
    pub fn default_for(id: MarketplaceId) -> Self {
        match id {
            MarketplaceId::CsFloat => Self::new(0, 250, 0),
            // Steam takes 15% with a 2-cent floor.
            MarketplaceId::Steam => Self::new(0, 1_500, 2),
            MarketplaceId::Buff163 => Self::new(0, 250, 0),
            MarketplaceId::Skinport => Self::new(0, 1_200, 0),
            MarketplaceId::DMarket => Self::new(0, 500, 0),
            MarketplaceId::Bitskins => Self::new(0, 1_000, 0),
        }
    }

    /// Total fee charged on a sale at `sell_price` minor units.
    pub fn sale_fee(&self, sell_price: i64) -> i64 {
        let price = sell_price.max(0) as i128;
        let pct = (price * self.percentage_bps as i128 + 9_999) / 10_000;
        let fee = self.flat_fee as i128 + pct;
        fee.max(self.min_fee as i128) as i64
    }

    /// What the seller actually receives for a sale at `sell_price`.
    /// May be negative for tiny prices under a flat/minimum fee.
    pub fn net_proceeds(&self, sell_price: i64) -> i64 {
        sell_price - self.sale_fee(sell_price)
    }
}

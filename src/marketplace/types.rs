//! Marketplace identifiers and raw listing data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Supported marketplaces.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum MarketplaceId {
    /// csfloat.com
    #[strum(to_string = "csfloat")]
    #[serde(rename = "csfloat")]
    CsFloat,
    /// Steam Community Market.
    #[strum(to_string = "steam")]
    Steam,
    /// buff.163.com
    #[strum(to_string = "buff163", serialize = "buff")]
    Buff163,
    /// skinport.com
    #[strum(to_string = "skinport")]
    Skinport,
    /// dmarket.com
    #[strum(to_string = "dmarket")]
    DMarket,
    /// bitskins.com
    #[strum(to_string = "bitskins")]
    Bitskins,
}

/// A single normalized listing as produced by an adapter.
///
/// Prices are already converted to the settlement currency but still
/// decimal; the ingest path turns them into integer minor units when
/// building a `PriceRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    /// Raw marketplace item descriptor, e.g. a `market_hash_name`.
    pub descriptor: String,
    /// Lowest listed price in the settlement currency.
    pub price: Decimal,
    /// Settlement currency code.
    pub currency: String,
    /// Units available at (or near) this price.
    pub listing_count: u32,
    /// Marketplace-specific listing reference, if any.
    pub listing_ref: Option<String>,
}

/// Which items an adapter should fetch prices for.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Canonical display names to look up, e.g. "AK-47 | Redline (Field-Tested)".
    pub names: Vec<String>,
}

impl ItemFilter {
    /// Filter for a set of item names.
    pub fn names(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

//! Skinport items API adapter.

use std::collections::HashSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::config::Config;
use crate::error::FetchError;

use super::{error_for_status, CurrencyConverter, ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

const BASE_URL: &str = "https://api.skinport.com/v1";
const APP_ID_CS2: &str = "730";

/// One entry of `GET /items`, which returns the whole market in one shot.
#[derive(Debug, Deserialize)]
struct Item {
    market_hash_name: String,
    currency: String,
    /// Null when nothing is currently listed.
    min_price: Option<Decimal>,
    quantity: u32,
}

/// Adapter for skinport.com. A single bulk call covers every item, so the
/// watchlist is filtered client-side.
pub struct SkinportAdapter {
    http: reqwest::Client,
    fx: CurrencyConverter,
    base_url: String,
}

impl SkinportAdapter {
    /// Create the adapter from shared plumbing and configuration.
    pub fn new(http: reqwest::Client, fx: CurrencyConverter, _config: &Config) -> Self {
        Self {
            http,
            fx,
            base_url: BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl MarketplaceAdapter for SkinportAdapter {
    fn id(&self) -> MarketplaceId {
        MarketplaceId::Skinport
    }

    #[instrument(skip_all, fields(marketplace = "skinport", items = filter.names.len()))]
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        let request = self.http.get(format!("{}/items", self.base_url)).query(&[
            ("app_id", APP_ID_CS2),
            ("currency", self.fx.settlement()),
        ]);

        let response = error_for_status(request.send().await?).await?;
        let items: Vec<Item> = response.json().await?;

        let wanted: HashSet<&str> = filter.names.iter().map(String::as_str).collect();
        let mut listings = Vec::new();
        for item in items {
            if !wanted.is_empty() && !wanted.contains(item.market_hash_name.as_str()) {
                continue;
            }
            let Some(min_price) = item.min_price else {
                continue;
            };
            let price = self.fx.to_settlement(min_price, &item.currency)?;
            listings.push(RawListing {
                descriptor: item.market_hash_name,
                price,
                currency: self.fx.settlement().to_string(),
                listing_count: item.quantity,
                listing_ref: None,
            });
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_min_price_deserializes_as_none() {
        let items: Vec<Item> = serde_json::from_str(
            r#"[
                {"market_hash_name":"AK-47 | Redline (Field-Tested)","currency":"USD","min_price":13.5,"quantity":41},
                {"market_hash_name":"M4A4 | Howl (Factory New)","currency":"USD","min_price":null,"quantity":0}
            ]"#,
        )
        .unwrap();
        assert!(items[0].min_price.is_some());
        assert!(items[1].min_price.is_none());
    }
}

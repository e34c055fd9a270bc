//! DMarket exchange API adapter.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FetchError;

use super::{error_for_status, CurrencyConverter, ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

const BASE_URL: &str = "https://api.dmarket.com";
const GAME_ID_CS2: &str = "a8db";

/// One market offer from `GET /exchange/v1/market/items`.
#[derive(Debug, Deserialize)]
struct Offer {
    #[serde(rename = "itemId")]
    item_id: String,
    title: String,
    /// Prices in minor units as strings, keyed by currency code.
    price: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OffersPage {
    objects: Vec<Offer>,
    total: Option<Total>,
}

#[derive(Debug, Deserialize)]
struct Total {
    offers: u32,
}

/// Adapter for dmarket.com. Offer prices arrive as stringified minor
/// units per currency.
pub struct DMarketAdapter {
    http: reqwest::Client,
    fx: CurrencyConverter,
    api_key: Option<String>,
    base_url: String,
}

impl DMarketAdapter {
    /// Create the adapter from shared plumbing and configuration.
    pub fn new(http: reqwest::Client, fx: CurrencyConverter, config: &Config) -> Self {
        Self {
            http,
            fx,
            api_key: config.dmarket_api_key.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    async fn fetch_one(&self, name: &str) -> Result<Option<RawListing>, FetchError> {
        let mut request = self
            .http
            .get(format!("{}/exchange/v1/market/items", self.base_url))
            .query(&[
                ("gameId", GAME_ID_CS2),
                ("title", name),
                ("currency", "USD"),
                ("orderBy", "price"),
                ("orderDir", "asc"),
                ("limit", "1"),
            ]);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }

        let response = error_for_status(request.send().await?).await?;
        let page: OffersPage = response.json().await?;

        // The title query is a substring match; require an exact hit.
        let Some(offer) = page.objects.iter().find(|o| o.title == name) else {
            return Ok(None);
        };
        let cents = offer
            .price
            .get("USD")
            .ok_or_else(|| FetchError::Parse(format!("offer {} has no USD price", offer.item_id)))?;
        let cents = Decimal::from_str(cents)
            .map_err(|_| FetchError::Parse(format!("unparseable DMarket price {cents:?}")))?;
        let price = self
            .fx
            .to_settlement(cents / Decimal::from(100), "USD")?;

        Ok(Some(RawListing {
            descriptor: name.to_string(),
            price,
            currency: self.fx.settlement().to_string(),
            listing_count: page.total.map(|t| t.offers).unwrap_or(1),
            listing_ref: Some(offer.item_id.clone()),
        }))
    }
}

#[async_trait]
impl MarketplaceAdapter for DMarketAdapter {
    fn id(&self) -> MarketplaceId {
        MarketplaceId::DMarket
    }

    #[instrument(skip_all, fields(marketplace = "dmarket", items = filter.names.len()))]
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        let mut listings = Vec::with_capacity(filter.names.len());
        for name in &filter.names {
            match self.fetch_one(name).await? {
                Some(listing) => listings.push(listing),
                None => debug!(name, "No DMarket offers"),
            }
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_prices_are_stringified_minor_units() {
        let page: OffersPage = serde_json::from_str(
            r#"{
                "objects":[{"itemId":"x1","title":"AK-47 | Redline (Field-Tested)","price":{"USD":"1350"}}],
                "total":{"offers":17}
            }"#,
        )
        .unwrap();
        let offer = &page.objects[0];
        assert_eq!(offer.price["USD"], "1350");
        assert_eq!(page.total.unwrap().offers, 17);
    }
}

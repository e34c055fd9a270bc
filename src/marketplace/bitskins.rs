//! Bitskins market search API adapter.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FetchError;

use super::{error_for_status, CurrencyConverter, ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

const BASE_URL: &str = "https://api.bitskins.com";
const APP_ID_CS2: u32 = 730;

/// One listing from `POST /market/search/{app_id}`.
#[derive(Debug, Deserialize)]
struct Listing {
    id: String,
    name: String,
    /// Price in thousandths of a USD.
    price: i64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    list: Vec<Listing>,
}

/// Adapter for bitskins.com. Prices are integers in 1/1000 USD.
pub struct BitskinsAdapter {
    http: reqwest::Client,
    fx: CurrencyConverter,
    api_key: Option<String>,
    base_url: String,
}

impl BitskinsAdapter {
    /// Create the adapter from shared plumbing and configuration.
    pub fn new(http: reqwest::Client, fx: CurrencyConverter, config: &Config) -> Self {
        Self {
            http,
            fx,
            api_key: config.bitskins_api_key.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    async fn fetch_one(&self, api_key: &str, name: &str) -> Result<Option<RawListing>, FetchError> {
        let request = self
            .http
            .post(format!("{}/market/search/{APP_ID_CS2}", self.base_url))
            .header("x-apikey", api_key)
            .json(&json!({
                "where": { "names": [name] },
                "order": [{ "field": "price", "order": "ASC" }],
                "limit": 20,
            }));

        let response = error_for_status(request.send().await?).await?;
        let body: SearchResponse = response.json().await?;

        let matching: Vec<&Listing> = body.list.iter().filter(|l| l.name == name).collect();
        let Some(cheapest) = matching.first() else {
            return Ok(None);
        };
        let price = self
            .fx
            .to_settlement(Decimal::new(cheapest.price, 3), "USD")?;
        Ok(Some(RawListing {
            descriptor: name.to_string(),
            price,
            currency: self.fx.settlement().to_string(),
            listing_count: matching.len() as u32,
            listing_ref: Some(cheapest.id.clone()),
        }))
    }
}

#[async_trait]
impl MarketplaceAdapter for BitskinsAdapter {
    fn id(&self) -> MarketplaceId {
        MarketplaceId::Bitskins
    }

    #[instrument(skip_all, fields(marketplace = "bitskins", items = filter.names.len()))]
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::Auth("bitskins_api_key is not configured".to_string()))?;

        let mut listings = Vec::with_capacity(filter.names.len());
        for name in &filter.names {
            match self.fetch_one(api_key, name).await? {
                Some(listing) => listings.push(listing),
                None => debug!(name, "No Bitskins listings"),
            }
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn thousandths_become_decimal_settlement_price() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"list":[{"id":"l9","name":"AK-47 | Redline (Field-Tested)","price":13500}]}"#,
        )
        .unwrap();

        let fx = CurrencyConverter::new("USD", HashMap::new());
        let price = fx
            .to_settlement(Decimal::new(body.list[0].price, 3), "USD")
            .unwrap();
        assert_eq!(price.to_string(), "13.500");
    }
}

//! CSFloat listings API adapter.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FetchError;

use super::{error_for_status, CurrencyConverter, ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

const BASE_URL: &str = "https://csfloat.com/api/v1";

/// One listing from `GET /listings`.
#[derive(Debug, Deserialize)]
struct Listing {
    id: String,
    /// Price in USD cents.
    price: i64,
}

#[derive(Debug, Deserialize)]
struct ListingsPage {
    data: Vec<Listing>,
}

/// Adapter for csfloat.com. Prices come back as integer USD cents.
pub struct CsFloatAdapter {
    http: reqwest::Client,
    fx: CurrencyConverter,
    api_key: Option<String>,
    base_url: String,
}

impl CsFloatAdapter {
    /// Create the adapter from shared plumbing and configuration.
    pub fn new(http: reqwest::Client, fx: CurrencyConverter, config: &Config) -> Self {
        Self {
            http,
            fx,
            api_key: config.csfloat_api_key.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    async fn fetch_one(&self, name: &str) -> Result<Option<RawListing>, FetchError> {
        let mut request = self
            .http
            .get(format!("{}/listings", self.base_url))
            .query(&[
                ("market_hash_name", name),
                ("sort_by", "lowest_price"),
                ("limit", "20"),
            ]);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", key);
        }

        let response = error_for_status(request.send().await?).await?;
        let page: ListingsPage = response.json().await?;

        let Some(cheapest) = page.data.first() else {
            return Ok(None);
        };
        let price = self
            .fx
            .to_settlement(Decimal::new(cheapest.price, 2), "USD")?;
        Ok(Some(RawListing {
            descriptor: name.to_string(),
            price,
            currency: self.fx.settlement().to_string(),
            listing_count: page.data.len() as u32,
            listing_ref: Some(cheapest.id.clone()),
        }))
    }
}

#[async_trait]
impl MarketplaceAdapter for CsFloatAdapter {
    fn id(&self) -> MarketplaceId {
        MarketplaceId::CsFloat
    }

    #[instrument(skip_all, fields(marketplace = "csfloat", items = filter.names.len()))]
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        let mut listings = Vec::with_capacity(filter.names.len());
        for name in &filter.names {
            match self.fetch_one(name).await? {
                Some(listing) => listings.push(listing),
                None => debug!(name, "No CSFloat listings"),
            }
        }
        Ok(listings)
    }
}

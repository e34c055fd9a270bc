//! Steam Community Market price overview adapter.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FetchError;

use super::{error_for_status, CurrencyConverter, ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

const BASE_URL: &str = "https://steamcommunity.com/market";
const APP_ID_CS2: &str = "730";
/// Steam currency code for USD.
const CURRENCY_USD: &str = "1";

/// Response of `GET /priceoverview`.
#[derive(Debug, Deserialize)]
struct PriceOverview {
    success: bool,
    /// Formatted price, e.g. "$13.50". Absent when nothing is listed.
    lowest_price: Option<String>,
    /// Formatted 24h volume, e.g. "1,234".
    volume: Option<String>,
}

/// Adapter for the Steam Community Market. Steam returns display-formatted
/// strings rather than numbers, so prices are scrubbed before parsing.
pub struct SteamAdapter {
    http: reqwest::Client,
    fx: CurrencyConverter,
    base_url: String,
}

impl SteamAdapter {
    /// Create the adapter from shared plumbing and configuration.
    pub fn new(http: reqwest::Client, fx: CurrencyConverter, _config: &Config) -> Self {
        Self {
            http,
            fx,
            base_url: BASE_URL.to_string(),
        }
    }

    async fn fetch_one(&self, name: &str) -> Result<Option<RawListing>, FetchError> {
        let request = self
            .http
            .get(format!("{}/priceoverview/", self.base_url))
            .query(&[
                ("appid", APP_ID_CS2),
                ("currency", CURRENCY_USD),
                ("market_hash_name", name),
            ]);

        let response = error_for_status(request.send().await?).await?;
        let overview: PriceOverview = response.json().await?;

        if !overview.success {
            return Ok(None);
        }
        let Some(lowest) = overview.lowest_price else {
            return Ok(None);
        };

        let price = self
            .fx
            .to_settlement(parse_display_price(&lowest)?, "USD")?;
        let volume = overview
            .volume
            .as_deref()
            .map(parse_display_count)
            .transpose()?
            .unwrap_or(1);
        Ok(Some(RawListing {
            descriptor: name.to_string(),
            price,
            currency: self.fx.settlement().to_string(),
            listing_count: volume,
            listing_ref: None,
        }))
    }
}

#[async_trait]
impl MarketplaceAdapter for SteamAdapter {
    fn id(&self) -> MarketplaceId {
        MarketplaceId::Steam
    }

    #[instrument(skip_all, fields(marketplace = "steam", items = filter.names.len()))]
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        let mut listings = Vec::with_capacity(filter.names.len());
        for name in &filter.names {
            match self.fetch_one(name).await? {
                Some(listing) => listings.push(listing),
                None => debug!(name, "No Steam listings"),
            }
        }
        Ok(listings)
    }
}

/// Parse a Steam display price like "$13.50" or "13,50€".
fn parse_display_price(formatted: &str) -> Result<Decimal, FetchError> {
    let mut cleaned: String = formatted
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    // Steam uses a comma decimal separator in some locales; with USD
    // requested the comma is a thousands separator unless it is the only
    // separator present.
    if cleaned.contains(',') && !cleaned.contains('.') {
        cleaned = cleaned.replace(',', ".");
    } else {
        cleaned = cleaned.replace(',', "");
    }
    Decimal::from_str(&cleaned)
        .map_err(|_| FetchError::Parse(format!("unparseable Steam price {formatted:?}")))
}

/// Parse a Steam display volume like "1,234".
fn parse_display_count(formatted: &str) -> Result<u32, FetchError> {
    formatted
        .replace(',', "")
        .parse()
        .map_err(|_| FetchError::Parse(format!("unparseable Steam volume {formatted:?}")))
}

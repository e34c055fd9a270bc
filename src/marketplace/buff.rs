//! Buff.163 goods API adapter.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::FetchError;

use super::{error_for_status, CurrencyConverter, ItemFilter, MarketplaceAdapter, MarketplaceId, RawListing};

const BASE_URL: &str = "https://buff.163.com/api";

/// One goods row from `GET /market/goods`.
#[derive(Debug, Deserialize)]
struct Goods {
    id: i64,
    market_hash_name: String,
    /// CNY price as a decimal string, e.g. "95.5".
    sell_min_price: String,
    sell_num: u32,
}

#[derive(Debug, Deserialize)]
struct GoodsData {
    items: Vec<Goods>,
}

#[derive(Debug, Deserialize)]
struct GoodsResponse {
    code: String,
    data: Option<GoodsData>,
}

/// Adapter for buff.163.com. Requires a logged-in session cookie; prices
/// are CNY and go through the FX table.
pub struct BuffAdapter {
    http: reqwest::Client,
    fx: CurrencyConverter,
    session: Option<String>,
    base_url: String,
}

impl BuffAdapter {
    /// Create the adapter from shared plumbing and configuration.
    pub fn new(http: reqwest::Client, fx: CurrencyConverter, config: &Config) -> Self {
        Self {
            http,
            fx,
            session: config.buff_session.clone(),
            base_url: BASE_URL.to_string(),
        }
    }

    async fn fetch_one(&self, session: &str, name: &str) -> Result<Option<RawListing>, FetchError> {
        let request = self
            .http
            .get(format!("{}/market/goods", self.base_url))
            .query(&[("game", "csgo"), ("search", name), ("page_num", "1")])
            .header("Cookie", format!("session={session}"));

        let response = error_for_status(request.send().await?).await?;
        let body: GoodsResponse = response.json().await?;

        if body.code != "OK" {
            // "Login Required" comes back as a 200 with an error code.
            return Err(FetchError::Auth(format!("Buff API code {:?}", body.code)));
        }
        let items = body.data.map(|d| d.items).unwrap_or_default();
        // Search is fuzzy; require the exact hash name.
        let Some(goods) = items.iter().find(|g| g.market_hash_name == name) else {
            return Ok(None);
        };

        let cny = Decimal::from_str(&goods.sell_min_price).map_err(|_| {
            FetchError::Parse(format!("unparseable Buff price {:?}", goods.sell_min_price))
        })?;
        let price = self.fx.to_settlement(cny, "CNY")?;
        Ok(Some(RawListing {
            descriptor: name.to_string(),
            price,
            currency: self.fx.settlement().to_string(),
            listing_count: goods.sell_num,
            listing_ref: Some(goods.id.to_string()),
        }))
    }
}

#[async_trait]
impl MarketplaceAdapter for BuffAdapter {
    fn id(&self) -> MarketplaceId {
        MarketplaceId::Buff163
    }

    #[instrument(skip_all, fields(marketplace = "buff163", items = filter.names.len()))]
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError> {
        let session = self
            .session
            .as_deref()
            .ok_or_else(|| FetchError::Auth("buff_session is not configured".to_string()))?;

        let mut listings = Vec::with_capacity(filter.names.len());
        for name in &filter.names {
            match self.fetch_one(session, name).await? {
                Some(listing) => listings.push(listing),
                None => debug!(name, "No Buff goods"),
            }
        }
        Ok(listings)
    }
}

//! Marketplace adapter abstraction and shared HTTP plumbing.
//!
//! Each marketplace implements [`MarketplaceAdapter`] against its own API
//! shape; the rest of the pipeline only sees normalized [`RawListing`]s in
//! the settlement currency. Adapters are selected at startup from
//! configuration, not hard-wired.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::config::Config;
use crate::error::{ConfigError, FetchError};

pub mod bitskins;
pub mod buff;
pub mod csfloat;
pub mod dmarket;
pub mod mock;
pub mod skinport;
pub mod steam;
pub mod types;

pub use types::{ItemFilter, MarketplaceId, RawListing};

/// Uniform capability every marketplace adapter provides.
///
/// Implementations own rate-limit compliance (a 429-equivalent response
/// maps to [`FetchError::RateLimited`]) and currency conversion to the
/// settlement currency. A failed fetch is reported as an error, never as a
/// listing with a null price.
#[async_trait]
pub trait MarketplaceAdapter: Send + Sync {
    /// Which marketplace this adapter talks to.
    fn id(&self) -> MarketplaceId;

    /// Fetch current lowest listings for the filtered items.
    async fn fetch_prices(&self, filter: &ItemFilter) -> Result<Vec<RawListing>, FetchError>;
}

/// Converts marketplace currencies into the settlement currency.
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    settlement: String,
    /// Units of settlement currency per unit of foreign currency.
    rates: HashMap<String, Decimal>,
}

impl CurrencyConverter {
    /// Create a converter for the given settlement currency and FX table.
    pub fn new(settlement: impl Into<String>, rates: HashMap<String, Decimal>) -> Self {
        Self {
            settlement: settlement.into().to_uppercase(),
            rates: rates
                .into_iter()
                .map(|(k, v)| (k.to_uppercase(), v))
                .collect(),
        }
    }

    /// The settlement currency code.
    pub fn settlement(&self) -> &str {
        &self.settlement
    }

    /// Convert an amount into the settlement currency.
    pub fn to_settlement(&self, amount: Decimal, currency: &str) -> Result<Decimal, FetchError> {
        let currency = currency.to_uppercase();
        if currency == self.settlement {
            return Ok(amount);
        }
        let rate = self
            .rates
            .get(&currency)
            .ok_or(FetchError::UnknownCurrency(currency))?;
        Ok(amount * rate)
    }
}

/// Build the shared HTTP client the adapters use.
pub fn build_http_client(config: &Config) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(config.fetch_timeout_ms))
        .connect_timeout(Duration::from_millis(2_000))
        .tcp_nodelay(true)
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .expect("failed to create HTTP client")
}

/// Map a non-success response to the right [`FetchError`].
///
/// 429 becomes `RateLimited` with the `Retry-After` hint so the scheduler
/// can back off; 401/403 become `Auth`.
pub async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status.as_u16() == 429 {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(FetchError::RateLimited { retry_after_secs });
    }

    if status.as_u16() == 401 || status.as_u16() == 403 {
        return Err(FetchError::Auth(format!("HTTP {status}")));
    }

    let body = response.text().await.unwrap_or_default();
    let snippet = body.chars().take(200).collect();
    Err(FetchError::Status {
        status: status.as_u16(),
        body: snippet,
    })
}

/// Instantiate adapters for every enabled marketplace.
pub fn build_adapters(
    config: &Config,
) -> Result<Vec<Arc<dyn MarketplaceAdapter>>, ConfigError> {
    let http = build_http_client(config);
    let fx = config.currency_converter()?;

    let mut adapters: Vec<Arc<dyn MarketplaceAdapter>> = Vec::new();
    for id in config.enabled_marketplace_ids()? {
        let adapter: Arc<dyn MarketplaceAdapter> = match id {
            MarketplaceId::CsFloat => {
                Arc::new(csfloat::CsFloatAdapter::new(http.clone(), fx.clone(), config))
            }
            MarketplaceId::Steam => {
                Arc::new(steam::SteamAdapter::new(http.clone(), fx.clone(), config))
            }
            MarketplaceId::Skinport => {
                Arc::new(skinport::SkinportAdapter::new(http.clone(), fx.clone(), config))
            }
            MarketplaceId::DMarket => {
                Arc::new(dmarket::DMarketAdapter::new(http.clone(), fx.clone(), config))
            }
            MarketplaceId::Buff163 => {
                Arc::new(buff::BuffAdapter::new(http.clone(), fx.clone(), config))
            }
            MarketplaceId::Bitskins => {
                Arc::new(bitskins::BitskinsAdapter::new(http.clone(), fx.clone(), config))
            }
        };
        adapters.push(adapter);
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn converter_passes_settlement_through() {
        let fx = CurrencyConverter::new("USD", HashMap::new());
        assert_eq!(fx.to_settlement(dec!(12.34), "usd").unwrap(), dec!(12.34));
    }

    #[test]
    fn converter_applies_rates() {
        let mut rates = HashMap::new();
        rates.insert("CNY".to_string(), dec!(0.14));
        let fx = CurrencyConverter::new("USD", rates);
        assert_eq!(fx.to_settlement(dec!(100), "CNY").unwrap(), dec!(14.00));
    }

    #[test]
    fn converter_rejects_unknown_currency() {
        let fx = CurrencyConverter::new("USD", HashMap::new());
        let err = fx.to_settlement(dec!(1), "EUR").unwrap_err();
        assert!(matches!(err, FetchError::UnknownCurrency(c) if c == "EUR"));
    }
}

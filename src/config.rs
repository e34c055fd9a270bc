//! Application configuration loaded from environment variables.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::detector::fees::FeeModel;
use crate::error::ConfigError;
use crate::marketplace::{CurrencyConverter, MarketplaceId};

/// Application configuration loaded from environment variables.
///
/// Invalid configuration is fatal at startup: a wrong fee model or profit
/// floor silently corrupts every detection pass, so nothing polls until
/// [`Config::validate`] passes.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Marketplaces ===
    /// Comma-separated marketplaces to poll (e.g. "csfloat,steam,skinport").
    #[serde(default = "default_enabled_marketplaces")]
    pub enabled_marketplaces: String,

    /// Settlement currency all prices are normalized into.
    #[serde(default = "default_settlement_currency")]
    pub settlement_currency: String,

    /// FX rates into the settlement currency, e.g. "CNY=0.14,EUR=1.08".
    #[serde(default)]
    pub fx_rates: Option<String>,

    // === Credentials ===
    /// CSFloat API key.
    #[serde(default)]
    pub csfloat_api_key: Option<String>,

    /// Skinport client id/secret pair, colon separated.
    #[serde(default)]
    pub skinport_api_key: Option<String>,

    /// DMarket public API key.
    #[serde(default)]
    pub dmarket_api_key: Option<String>,

    /// Buff.163 session cookie.
    #[serde(default)]
    pub buff_session: Option<String>,

    /// Bitskins API key.
    #[serde(default)]
    pub bitskins_api_key: Option<String>,

    // === Detection thresholds ===
    /// Minimum absolute net profit (minor currency units) to emit.
    #[serde(default = "default_min_profit")]
    pub min_profit: i64,

    /// Minimum net profit in basis points of the buy price.
    #[serde(default = "default_min_profit_bps")]
    pub min_profit_bps: u32,

    // === Alerting ===
    /// Profit change (minor units) that re-triggers an active alert.
    #[serde(default = "default_realert_delta")]
    pub realert_delta: i64,

    /// Cooldown before an unchanged active opportunity re-alerts.
    #[serde(default = "default_realert_cooldown_secs")]
    pub realert_cooldown_secs: u64,

    /// Optional webhook to POST new opportunities to.
    #[serde(default)]
    pub webhook_url: Option<String>,

    // === Scheduling ===
    /// Base polling interval per marketplace, seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-marketplace poll interval overrides, e.g. "steam=600".
    #[serde(default)]
    pub poll_interval_overrides: Option<String>,

    /// Detection pass interval, seconds.
    #[serde(default = "default_detect_interval_secs")]
    pub detect_interval_secs: u64,

    /// Fetch deadline per poll, milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    // === Freshness ===
    /// Per-marketplace staleness overrides in seconds, e.g. "steam=3600".
    #[serde(default)]
    pub staleness_overrides: Option<String>,

    // === Fees ===
    /// Per-marketplace sale fee overrides in basis points, e.g. "steam=1500".
    #[serde(default)]
    pub fee_bps_overrides: Option<String>,

    // === Store ===
    /// Maximum history entries retained per (item, marketplace).
    #[serde(default = "default_history_max_len")]
    pub history_max_len: usize,

    // === Catalog ===
    /// Optional JSON file mapping alias spellings to canonical names.
    #[serde(default)]
    pub alias_file: Option<String>,

    /// Optional JSON file listing items to watch.
    #[serde(default)]
    pub watchlist_file: Option<String>,

    // === Server ===
    /// HTTP server port for the read API.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable the Prometheus metrics exporter.
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Prometheus exporter port.
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

fn default_enabled_marketplaces() -> String {
    "csfloat,steam,skinport,dmarket".to_string()
}

fn default_settlement_currency() -> String {
    "USD".to_string()
}

fn default_min_profit() -> i64 {
    50 // 0.50 in minor units
}

fn default_min_profit_bps() -> u32 {
    500 // 5%
}

fn default_realert_delta() -> i64 {
    100
}

fn default_realert_cooldown_secs() -> u64 {
    900
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_detect_interval_secs() -> u64 {
    30
}

fn default_fetch_timeout_ms() -> u64 {
    10_000
}

fn default_history_max_len() -> usize {
    288
}

fn default_port() -> u16 {
    8080
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Everything detection needs to know about one marketplace.
#[derive(Debug, Clone)]
pub struct MarketProfile {
    /// Sale fee model applied to proceeds on this marketplace.
    pub fee: FeeModel,
    /// Records older than this are excluded from detection.
    pub max_staleness: Duration,
    /// How often this marketplace is polled.
    pub poll_interval: Duration,
}

/// Built-in staleness allowance per marketplace. Slower-updating venues
/// get longer windows.
fn default_staleness_secs(id: MarketplaceId) -> u64 {
    match id {
        MarketplaceId::CsFloat => 600,
        MarketplaceId::Steam => 1_800,
        MarketplaceId::Buff163 => 1_200,
        MarketplaceId::Skinport => 900,
        MarketplaceId::DMarket => 600,
        MarketplaceId::Bitskins => 900,
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Config = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is internally consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let enabled = self.enabled_marketplace_ids()?;
        if enabled.len() < 2 {
            return Err(ConfigError::Invalid {
                field: "enabled_marketplaces".to_string(),
                reason: "need at least two marketplaces to detect a spread".to_string(),
            });
        }

        if self.min_profit < 0 {
            return Err(ConfigError::Invalid {
                field: "min_profit".to_string(),
                reason: "must be non-negative".to_string(),
            });
        }

        if self.min_profit_bps > 100_000 {
            return Err(ConfigError::Invalid {
                field: "min_profit_bps".to_string(),
                reason: "must be at most 100000 (1000%)".to_string(),
            });
        }

        if self.poll_interval_secs == 0 || self.detect_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_secs/detect_interval_secs".to_string(),
                reason: "intervals must be positive".to_string(),
            });
        }

        if self.history_max_len == 0 {
            return Err(ConfigError::Invalid {
                field: "history_max_len".to_string(),
                reason: "must retain at least one record".to_string(),
            });
        }

        if let Some(url) = &self.webhook_url {
            url::Url::parse(url).map_err(|e| ConfigError::Invalid {
                field: "webhook_url".to_string(),
                reason: e.to_string(),
            })?;
        }

        // Every profile must build, so a bad override fails here and not
        // mid-run.
        for id in enabled {
            self.market_profile(id)?;
        }
        self.currency_converter()?;

        Ok(())
    }

    /// Parse the enabled marketplace list.
    pub fn enabled_marketplace_ids(&self) -> Result<Vec<MarketplaceId>, ConfigError> {
        let mut ids = Vec::new();
        for token in self.enabled_marketplaces.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let id = MarketplaceId::from_str(token).map_err(|_| ConfigError::Invalid {
                field: "enabled_marketplaces".to_string(),
                reason: format!("unknown marketplace {token:?}"),
            })?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Err(ConfigError::Missing("enabled_marketplaces".to_string()));
        }
        Ok(ids)
    }

    /// Build the FX converter from `fx_rates`.
    pub fn currency_converter(&self) -> Result<CurrencyConverter, ConfigError> {
        let mut rates = HashMap::new();
        if let Some(spec) = &self.fx_rates {
            for (key, value) in parse_kv_pairs(spec, "fx_rates")? {
                let rate = Decimal::from_str(&value).map_err(|e| ConfigError::Invalid {
                    field: "fx_rates".to_string(),
                    reason: format!("bad rate for {key}: {e}"),
                })?;
                if rate <= Decimal::ZERO {
                    return Err(ConfigError::Invalid {
                        field: "fx_rates".to_string(),
                        reason: format!("rate for {key} must be positive"),
                    });
                }
                rates.insert(key, rate);
            }
        }
        Ok(CurrencyConverter::new(&self.settlement_currency, rates))
    }

    /// Resolve the fee/staleness/polling profile for one marketplace.
    pub fn market_profile(&self, id: MarketplaceId) -> Result<MarketProfile, ConfigError> {
        let mut fee = FeeModel::default_for(id);
        if let Some(bps) = self.marketplace_override(&self.fee_bps_overrides, "fee_bps_overrides", id)? {
            if bps > 10_000 {
                return Err(ConfigError::Invalid {
                    field: "fee_bps_overrides".to_string(),
                    reason: format!("{id}: fee above 100% is not a fee model"),
                });
            }
            fee.percentage_bps = bps as u32;
        }

        let staleness_secs = self
            .marketplace_override(&self.staleness_overrides, "staleness_overrides", id)?
            .unwrap_or_else(|| default_staleness_secs(id));
        if staleness_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "staleness_overrides".to_string(),
                reason: format!("{id}: staleness window must be positive"),
            });
        }

        let poll_secs = self
            .marketplace_override(&self.poll_interval_overrides, "poll_interval_overrides", id)?
            .unwrap_or(self.poll_interval_secs);

        Ok(MarketProfile {
            fee,
            max_staleness: Duration::from_secs(staleness_secs),
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    /// Profiles for every enabled marketplace.
    pub fn market_profiles(&self) -> Result<HashMap<MarketplaceId, MarketProfile>, ConfigError> {
        let mut profiles = HashMap::new();
        for id in self.enabled_marketplace_ids()? {
            profiles.insert(id, self.market_profile(id)?);
        }
        Ok(profiles)
    }

    /// Load the alias table, if configured.
    pub fn aliases(&self) -> Result<HashMap<String, String>, ConfigError> {
        match &self.alias_file {
            None => Ok(HashMap::new()),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
                    field: "alias_file".to_string(),
                    reason: format!("{path}: {e}"),
                })?;
                serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                    field: "alias_file".to_string(),
                    reason: format!("{path}: {e}"),
                })
            }
        }
    }

    /// Load the watchlist, falling back to the built-in default.
    pub fn watchlist(&self) -> Result<Vec<String>, ConfigError> {
        match &self.watchlist_file {
            None => Ok(crate::catalog::default_watchlist()),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
                    field: "watchlist_file".to_string(),
                    reason: format!("{path}: {e}"),
                })?;
                let names: Vec<String> =
                    serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
                        field: "watchlist_file".to_string(),
                        reason: format!("{path}: {e}"),
                    })?;
                if names.is_empty() {
                    return Err(ConfigError::Invalid {
                        field: "watchlist_file".to_string(),
                        reason: "watchlist is empty".to_string(),
                    });
                }
                Ok(names)
            }
        }
    }

    fn marketplace_override(
        &self,
        spec: &Option<String>,
        field: &str,
        id: MarketplaceId,
    ) -> Result<Option<u64>, ConfigError> {
        let Some(spec) = spec else { return Ok(None) };
        for (key, value) in parse_kv_pairs(spec, field)? {
            let parsed = MarketplaceId::from_str(&key).map_err(|_| ConfigError::Invalid {
                field: field.to_string(),
                reason: format!("unknown marketplace {key:?}"),
            })?;
            if parsed == id {
                let n: u64 = value.parse().map_err(|e| ConfigError::Invalid {
                    field: field.to_string(),
                    reason: format!("{key}: {e}"),
                })?;
                return Ok(Some(n));
            }
        }
        Ok(None)
    }
}

/// Parse "key=value,key=value" lists used by several override settings.
fn parse_kv_pairs(spec: &str, field: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (key, value) = token.split_once('=').ok_or_else(|| ConfigError::Invalid {
            field: field.to_string(),
            reason: format!("expected key=value, got {token:?}"),
        })?;
        pairs.push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(pairs)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled_marketplaces: default_enabled_marketplaces(),
            settlement_currency: default_settlement_currency(),
            fx_rates: None,
            csfloat_api_key: None,
            skinport_api_key: None,
            dmarket_api_key: None,
            buff_session: None,
            bitskins_api_key: None,
            min_profit: default_min_profit(),
            min_profit_bps: default_min_profit_bps(),
            realert_delta: default_realert_delta(),
            realert_cooldown_secs: default_realert_cooldown_secs(),
            webhook_url: None,
            poll_interval_secs: default_poll_interval_secs(),
            poll_interval_overrides: None,
            detect_interval_secs: default_detect_interval_secs(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            staleness_overrides: None,
            fee_bps_overrides: None,
            history_max_len: default_history_max_len(),
            alias_file: None,
            watchlist_file: None,
            port: default_port(),
            metrics_enabled: default_true(),
            metrics_port: default_metrics_port(),
            rust_log: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_single_marketplace() {
        let config = Config {
            enabled_marketplaces: "steam".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_marketplace() {
        let config = Config {
            enabled_marketplaces: "steam,ebay".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_webhook_url() {
        let config = Config {
            webhook_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn fee_override_is_applied() {
        let config = Config {
            fee_bps_overrides: Some("steam=1200".to_string()),
            ..Default::default()
        };
        let profile = config.market_profile(MarketplaceId::Steam).unwrap();
        assert_eq!(profile.fee.percentage_bps, 1_200);

        // Unmentioned marketplaces keep their defaults.
        let csfloat = config.market_profile(MarketplaceId::CsFloat).unwrap();
        assert_eq!(csfloat.fee, FeeModel::default_for(MarketplaceId::CsFloat));
    }

    #[test]
    fn staleness_defaults_favor_slow_marketplaces() {
        let config = Config::default();
        let steam = config.market_profile(MarketplaceId::Steam).unwrap();
        let csfloat = config.market_profile(MarketplaceId::CsFloat).unwrap();
        assert!(steam.max_staleness > csfloat.max_staleness);
    }

    #[test]
    fn poll_interval_override_is_applied() {
        let config = Config {
            poll_interval_overrides: Some("steam=600".to_string()),
            ..Default::default()
        };
        let steam = config.market_profile(MarketplaceId::Steam).unwrap();
        let other = config.market_profile(MarketplaceId::CsFloat).unwrap();
        assert_eq!(steam.poll_interval, Duration::from_secs(600));
        assert_eq!(other.poll_interval, Duration::from_secs(300));
    }

    #[test]
    fn fx_rates_parse_into_converter() {
        let config = Config {
            fx_rates: Some("CNY=0.14, EUR=1.08".to_string()),
            ..Default::default()
        };
        assert!(config.currency_converter().is_ok());

        let bad = Config {
            fx_rates: Some("CNY=cheap".to_string()),
            ..Default::default()
        };
        assert!(bad.currency_converter().is_err());
    }
}

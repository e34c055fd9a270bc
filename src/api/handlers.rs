//! HTTP API handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::catalog::{CanonicalItem, Resolver};
use crate::config::{Config, MarketProfile};
use crate::detector::{Detector, Opportunity};
use crate::error::ConfigError;
use crate::marketplace::MarketplaceId;
use crate::store::{MarketplaceHealth, PriceStore};

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Whether the pipeline is polling.
    pub ready: Arc<std::sync::atomic::AtomicBool>,
    /// Shared price store.
    pub store: Arc<PriceStore>,
    /// Detection engine, for the opportunity snapshot.
    pub detector: Arc<Detector>,
    /// Item identity resolver.
    pub resolver: Arc<Resolver>,
    /// Per-marketplace profiles, for staleness flags.
    pub profiles: Arc<HashMap<MarketplaceId, MarketProfile>>,
}

impl AppState {
    /// Build API state from the pipeline components.
    pub fn new(
        config: &Config,
        store: Arc<PriceStore>,
        detector: Arc<Detector>,
        resolver: Arc<Resolver>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            ready: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            store,
            detector,
            resolver,
            profiles: Arc::new(config.market_profiles()?),
        })
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready
            .store(ready, std::sync::atomic::Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether the pipeline is polling.
    pub ready: bool,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Items currently tracked.
    pub items: usize,
    /// Opportunities in the latest detection pass.
    pub opportunities: usize,
    /// Descriptors quarantined so far.
    pub quarantined: usize,
    /// Per-marketplace poll health.
    pub marketplaces: HashMap<MarketplaceId, MarketplaceHealth>,
}

/// One marketplace's price in a skin response.
#[derive(Debug, Serialize)]
pub struct SkinPrice {
    /// Marketplace the price was observed on.
    pub marketplace: MarketplaceId,
    /// Lowest listed price, minor units.
    pub price: i64,
    /// Settlement currency code.
    pub currency: String,
    /// When the observation was made.
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
    /// Age of the observation, seconds.
    pub age_secs: u64,
    /// Whether the record is past the marketplace's staleness window.
    pub stale: bool,
    /// Units available at this price.
    pub listing_count: u32,
}

/// Response of the skin lookup endpoint.
#[derive(Debug, Serialize)]
pub struct SkinResponse {
    /// Canonical identity the query resolved to.
    pub item: CanonicalItem,
    /// Latest price per marketplace.
    pub prices: Vec<SkinPrice>,
}

/// Error body for 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error.
    pub error: String,
}

/// Query parameters of the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Marketplace to read history for.
    pub marketplace: MarketplaceId,
    /// Window length looking back from now, seconds.
    #[serde(default = "default_since_secs")]
    pub since_secs: u64,
}

fn default_since_secs() -> u64 {
    86_400
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if polling, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse { ready: is_ready };
    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - pipeline and marketplace health overview.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        status: if state.is_ready() { "running" } else { "starting" },
        items: state.store.item_count(),
        opportunities: state.detector.current().len(),
        quarantined: state.resolver.quarantined().len(),
        marketplaces: state.store.all_health(),
    })
}

/// Opportunities handler - the latest detection pass snapshot.
pub async fn opportunities(State(state): State<AppState>) -> Json<Vec<Opportunity>> {
    Json(state.detector.current())
}

/// Skin lookup handler - latest prices with staleness flags.
pub async fn skin(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SkinResponse>, (StatusCode, Json<ErrorResponse>)> {
    let item = state.resolver.lookup(&name).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    let now = OffsetDateTime::now_utc();
    let mut prices: Vec<SkinPrice> = state
        .store
        .get_all_latest(&item.item_id)
        .into_values()
        .map(|record| {
            let age = record.age(now);
            let stale = state
                .profiles
                .get(&record.marketplace)
                .map(|p| age > p.max_staleness)
                .unwrap_or(true);
            SkinPrice {
                marketplace: record.marketplace,
                price: record.price,
                currency: record.currency,
                observed_at: record.observed_at,
                age_secs: age.whole_seconds().max(0) as u64,
                stale,
                listing_count: record.listing_count,
            }
        })
        .collect();
    prices.sort_by_key(|p| p.marketplace);

    Ok(Json(SkinResponse { item, prices }))
}

/// History handler - one marketplace's observations within a window.
pub async fn history(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let item = state.resolver.lookup(&name).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    // Oversized windows clamp to "everything" instead of wrapping into
    // the future and returning nothing.
    let window = time::Duration::seconds(i64::try_from(query.since_secs).unwrap_or(i64::MAX));
    let since = OffsetDateTime::now_utc()
        .checked_sub(window)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let records = state
        .store
        .get_history(&item.item_id, query.marketplace, since);
    Ok(Json(records))
}

//! Polling and detection loops.
//!
//! Each enabled marketplace gets its own poll task on its own interval, so
//! one slow or rate-limited venue never delays the others. A separate task
//! runs detection passes over whatever the store currently holds; the two
//! cadences are fully decoupled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::alert::Dispatcher;
use crate::catalog::Resolver;
use crate::config::Config;
use crate::detector::Detector;
use crate::error::{ConfigError, FetchError};
use crate::marketplace::{ItemFilter, MarketplaceAdapter, RawListing};
use crate::metrics;
use crate::store::{PriceRecord, PriceStore};

/// Exponential backoff for consecutive poll failures, capped at eight
/// times the base interval.
struct Backoff {
    base: Duration,
    failures: u32,
}

impl Backoff {
    fn new(base: Duration) -> Self {
        Self { base, failures: 0 }
    }

    fn on_success(&mut self) {
        self.failures = 0;
    }

    fn on_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Delay before the next poll.
    fn delay(&self) -> Duration {
        let factor = 1u32 << self.failures.min(3);
        self.base.saturating_mul(factor)
    }
}

/// Owns the background tasks of the pipeline.
pub struct Scheduler {
    config: Config,
    resolver: Arc<Resolver>,
    store: Arc<PriceStore>,
    detector: Arc<Detector>,
    dispatcher: Arc<Dispatcher>,
    adapters: Vec<Arc<dyn MarketplaceAdapter>>,
}

impl Scheduler {
    /// Assemble the scheduler from already-built components.
    pub fn new(
        config: Config,
        resolver: Arc<Resolver>,
        store: Arc<PriceStore>,
        detector: Arc<Detector>,
        dispatcher: Arc<Dispatcher>,
        adapters: Vec<Arc<dyn MarketplaceAdapter>>,
    ) -> Self {
        Self {
            config,
            resolver,
            store,
            detector,
            dispatcher,
            adapters,
        }
    }

    /// Spawn all loops and run until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), ConfigError> {
        let watchlist = self.config.watchlist()?;
        let filter = ItemFilter::names(watchlist);
        let mut tasks = JoinSet::new();

        for adapter in &self.adapters {
            let profile = self.config.market_profile(adapter.id())?;
            tasks.spawn(poll_loop(
                adapter.clone(),
                filter.clone(),
                self.resolver.clone(),
                self.store.clone(),
                profile.poll_interval,
                Duration::from_millis(self.config.fetch_timeout_ms),
                shutdown.clone(),
            ));
        }

        tasks.spawn(detect_loop(
            self.detector.clone(),
            self.dispatcher.clone(),
            self.store.clone(),
            Duration::from_secs(self.config.detect_interval_secs),
            shutdown.clone(),
        ));

        // Wait for shutdown, then let every loop notice and drain.
        let _ = shutdown.changed().await;
        info!("Scheduler shutting down");
        while let Some(result) = tasks.join_next().await {
            if let Err(join_error) = result {
                error!(%join_error, "Background task panicked");
            }
        }
        Ok(())
    }
}

async fn poll_loop(
    adapter: Arc<dyn MarketplaceAdapter>,
    filter: ItemFilter,
    resolver: Arc<Resolver>,
    store: Arc<PriceStore>,
    poll_interval: Duration,
    fetch_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let marketplace = adapter.id();
    let mut backoff = Backoff::new(poll_interval);
    info!(%marketplace, interval_secs = poll_interval.as_secs(), "Poll loop started");

    loop {
        let delay = match poll_once(&*adapter, &filter, &resolver, &store, fetch_timeout).await {
            Ok(()) => {
                backoff.on_success();
                backoff.delay()
            }
            Err(FetchError::RateLimited { retry_after_secs }) => {
                backoff.on_failure();
                // The venue told us when to come back; respect it.
                backoff.delay().max(Duration::from_secs(retry_after_secs))
            }
            Err(_) => {
                backoff.on_failure();
                backoff.delay()
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                debug!(%marketplace, "Poll loop stopped");
                return;
            }
        }
    }
}

/// One poll: fetch, resolve, ingest. Health is updated either way.
///
/// Public so one-shot scans can reuse the exact pipeline path.
pub async fn poll_once(
    adapter: &dyn MarketplaceAdapter,
    filter: &ItemFilter,
    resolver: &Resolver,
    store: &PriceStore,
    fetch_timeout: Duration,
) -> Result<(), FetchError> {
    let marketplace = adapter.id();
    let started = Instant::now();

    let result = match tokio::time::timeout(fetch_timeout, adapter.fetch_prices(filter)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }),
    };
    metrics::observe_poll(&marketplace.to_string(), started.elapsed(), result.is_ok());

    let now = OffsetDateTime::now_utc();
    match result {
        Ok(listings) => {
            let total = listings.len();
            let applied = ingest(marketplace, listings, resolver, store, now);
            store.record_success(marketplace, now);
            debug!(%marketplace, total, applied, "Poll complete");
            Ok(())
        }
        Err(error) => {
            store.record_failure(marketplace, &error.to_string(), now);
            warn!(%marketplace, %error, "Poll failed");
            Err(error)
        }
    }
}

/// Resolve listings to canonical items and upsert them. Unresolvable
/// descriptors are quarantined by the resolver and skipped here.
fn ingest(
    marketplace: crate::marketplace::MarketplaceId,
    listings: Vec<RawListing>,
    resolver: &Resolver,
    store: &PriceStore,
    observed_at: OffsetDateTime,
) -> usize {
    let mut applied = 0;
    for listing in listings {
        let item = match resolver.resolve(marketplace, &listing.descriptor) {
            Ok(item) => item,
            Err(_) => continue,
        };
        let Some(price) = to_minor_units(listing.price) else {
            warn!(
                %marketplace,
                descriptor = listing.descriptor,
                price = %listing.price,
                "Listing price out of range"
            );
            continue;
        };
        let outcome = store.upsert(PriceRecord {
            item_id: item.item_id,
            marketplace,
            price,
            currency: listing.currency,
            observed_at,
            listing_count: listing.listing_count,
            source_listing_ref: listing.listing_ref,
        });
        if outcome == crate::store::UpsertOutcome::Applied {
            applied += 1;
        }
    }
    applied
}

/// Convert a settlement-currency decimal into integer minor units.
fn to_minor_units(price: Decimal) -> Option<i64> {
    (price * Decimal::from(100))
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

async fn detect_loop(
    detector: Arc<Detector>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<PriceStore>,
    detect_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = detect_interval.as_secs(), "Detection loop started");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(detect_interval) => {}
            _ = shutdown.changed() => {
                debug!("Detection loop stopped");
                return;
            }
        }

        let now = OffsetDateTime::now_utc();
        let opportunities = detector.run_pass(&store, now);
        dispatcher.dispatch(&opportunities, now).await;
    }
}

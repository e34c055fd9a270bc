//! Arbitrage detection over the price store.
//!
//! Each pass recomputes every opportunity from scratch from the current
//! store contents. There is no incremental state to drift: an opportunity
//! exists exactly when a fresh buy/sell pair clears both profit floors.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::config::{Config, MarketProfile};
use crate::error::ConfigError;
use crate::marketplace::MarketplaceId;
use crate::metrics;
use crate::store::{PriceRecord, PriceStore};

use super::types::Opportunity;

/// The detection engine: fee models, freshness windows, profit floors.
pub struct Detector {
    profiles: HashMap<MarketplaceId, MarketProfile>,
    min_profit: i64,
    min_profit_bps: u32,
    current: RwLock<Vec<Opportunity>>,
}

impl Detector {
    /// Build a detector from validated configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            profiles: config.market_profiles()?,
            min_profit: config.min_profit,
            min_profit_bps: config.min_profit_bps,
            current: RwLock::new(Vec::new()),
        })
    }

    /// Run one detection pass at `now` and return the opportunities found.
    ///
    /// Also replaces the snapshot served by [`Detector::current`].
    #[instrument(skip_all, fields(items = store.item_count()))]
    pub fn run_pass(&self, store: &PriceStore, now: OffsetDateTime) -> Vec<Opportunity> {
        let started = Instant::now();
        let mut found = Vec::new();

        for item_id in store.item_ids() {
            let latest = store.get_all_latest(&item_id);
            let fresh: Vec<&PriceRecord> = latest
                .values()
                .filter(|record| self.is_fresh(record, now))
                .collect();
            if fresh.len() < 2 {
                continue;
            }

            for buy in &fresh {
                // Nothing to buy at this price.
                if buy.listing_count == 0 || buy.price <= 0 {
                    continue;
                }
                for sell in &fresh {
                    if sell.marketplace == buy.marketplace {
                        continue;
                    }
                    if let Some(opp) = self.evaluate_pair(buy, sell, now) {
                        found.push(opp);
                    }
                }
            }
        }

        // Deterministic output order regardless of map iteration.
        found.sort_by(|a, b| {
            (&a.item_id, a.buy_marketplace, a.sell_marketplace).cmp(&(
                &b.item_id,
                b.buy_marketplace,
                b.sell_marketplace,
            ))
        });

        metrics::observe_detection_pass(started.elapsed(), found.len());
        debug!(
            opportunities = found.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Detection pass complete"
        );

        *self
            .current
            .write()
            .expect("detector snapshot lock poisoned") = found.clone();
        found
    }

    /// The snapshot produced by the most recent pass.
    pub fn current(&self) -> Vec<Opportunity> {
        self.current
            .read()
            .expect("detector snapshot lock poisoned")
            .clone()
    }

    fn is_fresh(&self, record: &PriceRecord, now: OffsetDateTime) -> bool {
        let Some(profile) = self.profiles.get(&record.marketplace) else {
            // Record from a marketplace that is no longer enabled.
            return false;
        };
        let age = record.age(now);
        age >= time::Duration::ZERO && age <= profile.max_staleness
    }

    fn evaluate_pair(
        &self,
        buy: &PriceRecord,
        sell: &PriceRecord,
        now: OffsetDateTime,
    ) -> Option<Opportunity> {
        let sell_profile = self.profiles.get(&sell.marketplace)?;
        let net_profit = sell_profile.fee.net_proceeds(sell.price) - buy.price;
        if net_profit <= 0 || net_profit < self.min_profit {
            return None;
        }
        // net_profit / buy_price >= min_profit_bps / 10_000, compared as a
        // cross-multiplication so no division ever rounds in our favor.
        if (net_profit as i128) * 10_000 < (self.min_profit_bps as i128) * (buy.price as i128) {
            return None;
        }

        let staleness = buy.age(now).max(sell.age(now)).whole_seconds().max(0) as u64;
        Some(Opportunity {
            item_id: buy.item_id.clone(),
            buy_marketplace: buy.marketplace,
            sell_marketplace: sell.marketplace,
            buy_price: buy.price,
            sell_price: sell.price,
            net_profit,
            net_profit_bps: ((net_profit as i128) * 10_000 / (buy.price as i128)) as u32,
            detected_at: now,
            input_staleness_secs: staleness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use crate::catalog::ItemId;

    const NOW: OffsetDateTime = datetime!(2026-01-01 12:00 UTC);

    fn detector(config: &Config) -> Detector {
        Detector::new(config).unwrap()
    }

    fn record(
        name: &str,
        marketplace: MarketplaceId,
        price: i64,
        observed_at: OffsetDateTime,
    ) -> PriceRecord {
        PriceRecord {
            item_id: ItemId(name.to_string()),
            marketplace,
            price,
            currency: "USD".to_string(),
            observed_at,
            listing_count: 3,
            source_listing_ref: None,
        }
    }

    fn all_enabled() -> Config {
        Config {
            enabled_marketplaces: "csfloat,steam,buff163,skinport,dmarket,bitskins".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn detects_spread_net_of_sell_fees() {
        let store = PriceStore::new(10);
        let redline = "ak-47|redline|field-tested";
        store.upsert(record(redline, MarketplaceId::CsFloat, 1_000, NOW));
        store.upsert(record(redline, MarketplaceId::Steam, 1_350, NOW));

        let config = Config::default();
        let opportunities = detector(&config).run_pass(&store, NOW);

        assert_eq!(opportunities.len(), 1);
        let opp = &opportunities[0];
        assert_eq!(opp.buy_marketplace, MarketplaceId::CsFloat);
        assert_eq!(opp.sell_marketplace, MarketplaceId::Steam);
        // Steam nets 1147 after its 15% fee; minus the 1000 buy.
        assert_eq!(opp.net_profit, 147);
        assert_eq!(opp.net_profit_bps, 1_470);
    }

    #[test]
    fn reverse_direction_is_not_profitable() {
        let store = PriceStore::new(10);
        let redline = "ak-47|redline|field-tested";
        store.upsert(record(redline, MarketplaceId::CsFloat, 1_000, NOW));
        store.upsert(record(redline, MarketplaceId::Steam, 1_350, NOW));

        let opportunities = detector(&Config::default()).run_pass(&store, NOW);
        assert!(!opportunities
            .iter()
            .any(|o| o.buy_marketplace == MarketplaceId::Steam));
    }

    #[test]
    fn stale_record_is_excluded_even_when_profitable() {
        let store = PriceStore::new(10);
        let redline = "ak-47|redline|field-tested";
        // CSFloat allows 600s of staleness; this record is two hours old.
        store.upsert(record(
            redline,
            MarketplaceId::CsFloat,
            1_000,
            NOW - time::Duration::hours(2),
        ));
        store.upsert(record(redline, MarketplaceId::Steam, 1_350, NOW));

        let opportunities = detector(&Config::default()).run_pass(&store, NOW);
        assert!(opportunities.is_empty());
    }

    #[test]
    fn zero_listing_count_excludes_buy_side_only() {
        let store = PriceStore::new(10);
        let name = "awp|asiimov|field-tested";
        let mut cheap = record(name, MarketplaceId::CsFloat, 1_000, NOW);
        cheap.listing_count = 0;
        store.upsert(cheap);
        store.upsert(record(name, MarketplaceId::Steam, 1_350, NOW));

        let opportunities = detector(&Config::default()).run_pass(&store, NOW);
        // Cannot buy on CSFloat, and selling there from a 1350 buy loses.
        assert!(opportunities.is_empty());
    }

    #[test]
    fn absolute_profit_floor_applies() {
        let store = PriceStore::new(10);
        let name = "glock-18|water-elemental|minimal-wear";
        store.upsert(record(name, MarketplaceId::CsFloat, 100, NOW));
        store.upsert(record(name, MarketplaceId::DMarket, 140, NOW));

        let config = Config {
            min_profit: 50,
            min_profit_bps: 0,
            ..all_enabled()
        };
        // DMarket nets 133 after 5%; profit 33 is under the 50 floor.
        assert!(detector(&config).run_pass(&store, NOW).is_empty());

        let lower = Config {
            min_profit: 30,
            min_profit_bps: 0,
            ..all_enabled()
        };
        assert_eq!(detector(&lower).run_pass(&store, NOW).len(), 1);
    }

    #[test]
    fn percentage_floor_uses_exact_arithmetic() {
        let store = PriceStore::new(10);
        let name = "m4a4|howl|factory-new";
        store.upsert(record(name, MarketplaceId::CsFloat, 100_000, NOW));
        store.upsert(record(name, MarketplaceId::DMarket, 110_000, NOW));

        // DMarket nets 104_500 after 5%; profit 4_500 is 4.5% of the buy.
        let config = Config {
            min_profit: 0,
            min_profit_bps: 450,
            ..all_enabled()
        };
        assert_eq!(detector(&config).run_pass(&store, NOW).len(), 1);

        let stricter = Config {
            min_profit: 0,
            min_profit_bps: 451,
            ..all_enabled()
        };
        assert!(detector(&stricter).run_pass(&store, NOW).is_empty());
    }

    #[test]
    fn one_buy_with_multiple_profitable_sells_emits_each_pair() {
        let store = PriceStore::new(10);
        let name = "ak-47|vulcan|minimal-wear";
        store.upsert(record(name, MarketplaceId::CsFloat, 1_000, NOW));
        store.upsert(record(name, MarketplaceId::Steam, 1_500, NOW));
        store.upsert(record(name, MarketplaceId::DMarket, 1_300, NOW));

        let opportunities = detector(&Config::default()).run_pass(&store, NOW);
        let sells: Vec<MarketplaceId> = opportunities
            .iter()
            .filter(|o| o.buy_marketplace == MarketplaceId::CsFloat)
            .map(|o| o.sell_marketplace)
            .collect();
        assert!(sells.contains(&MarketplaceId::Steam));
        assert!(sells.contains(&MarketplaceId::DMarket));
    }

    #[test]
    fn current_snapshot_tracks_last_pass() {
        let store = PriceStore::new(10);
        let name = "ak-47|redline|field-tested";
        store.upsert(record(name, MarketplaceId::CsFloat, 1_000, NOW));
        store.upsert(record(name, MarketplaceId::Steam, 1_350, NOW));

        let detector = detector(&Config::default());
        assert!(detector.current().is_empty());
        detector.run_pass(&store, NOW);
        assert_eq!(detector.current().len(), 1);

        // Spread collapses; next pass clears the snapshot.
        store.upsert(record(
            name,
            MarketplaceId::Steam,
            1_050,
            NOW + time::Duration::minutes(1),
        ));
        detector.run_pass(&store, NOW + time::Duration::minutes(1));
        assert!(detector.current().is_empty());
    }
}

//! Latest-price and history storage.

use std::collections::{HashMap, VecDeque};

use dashmap::DashMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::catalog::ItemId;
use crate::marketplace::MarketplaceId;
use crate::metrics;

use super::types::{MarketplaceHealth, PriceRecord, UpsertOutcome};

/// Per-marketplace slot inside an item entry.
#[derive(Debug, Clone)]
struct PriceEntry {
    latest: PriceRecord,
    /// Prior observations, oldest first; bounded; ends just before latest.
    history: VecDeque<PriceRecord>,
}

/// The single shared mutable structure in the pipeline.
///
/// Keyed by item so concurrent upserts from different adapters only
/// contend when they touch the same item; dashmap sharding keeps
/// unrelated marketplaces from serializing on a global lock.
///
/// Upserts are idempotent per `(item, marketplace, observed_at)` and
/// monotonic in `observed_at`: a delayed response never overwrites a
/// newer record. Failed polls never write records at all; they only
/// update marketplace health, and staleness follows from `observed_at`
/// aging past the marketplace's threshold.
pub struct PriceStore {
    items: DashMap<ItemId, HashMap<MarketplaceId, PriceEntry>>,
    health: DashMap<MarketplaceId, MarketplaceHealth>,
    history_max_len: usize,
}

impl PriceStore {
    /// Create a store retaining at most `history_max_len` prior records
    /// per (item, marketplace).
    pub fn new(history_max_len: usize) -> Self {
        Self {
            items: DashMap::new(),
            health: DashMap::new(),
            history_max_len: history_max_len.max(1),
        }
    }

    /// Insert or replace the latest record for (item, marketplace).
    pub fn upsert(&self, record: PriceRecord) -> UpsertOutcome {
        use std::collections::hash_map::Entry;

        let mut item_entry = self.items.entry(record.item_id.clone()).or_default();

        match item_entry.entry(record.marketplace) {
            Entry::Vacant(slot) => {
                slot.insert(PriceEntry {
                    latest: record,
                    history: VecDeque::new(),
                });
                metrics::inc_records_upserted();
                UpsertOutcome::Applied
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if record.observed_at < entry.latest.observed_at {
                    debug!(
                        item_id = %record.item_id,
                        marketplace = %record.marketplace,
                        observed_at = %record.observed_at,
                        latest = %entry.latest.observed_at,
                        "Discarding late-arriving stale write"
                    );
                    metrics::inc_stale_writes_discarded();
                    return UpsertOutcome::StaleDiscarded;
                }
                if record.observed_at == entry.latest.observed_at {
                    metrics::inc_duplicate_writes_ignored();
                    return UpsertOutcome::DuplicateIgnored;
                }

                let previous = std::mem::replace(&mut entry.latest, record);
                entry.history.push_back(previous);
                while entry.history.len() > self.history_max_len {
                    entry.history.pop_front();
                }
                metrics::inc_records_upserted();
                UpsertOutcome::Applied
            }
        }
    }

    /// Latest record for one (item, marketplace), if any.
    pub fn get_latest(&self, item_id: &ItemId, marketplace: MarketplaceId) -> Option<PriceRecord> {
        self.items
            .get(item_id)
            .and_then(|entry| entry.get(&marketplace).map(|e| e.latest.clone()))
    }

    /// Latest records for an item across all marketplaces.
    pub fn get_all_latest(&self, item_id: &ItemId) -> HashMap<MarketplaceId, PriceRecord> {
        self.items
            .get(item_id)
            .map(|entry| {
                entry
                    .iter()
                    .map(|(mp, e)| (*mp, e.latest.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// History for (item, marketplace) since `since`, oldest first,
    /// including the latest record.
    pub fn get_history(
        &self,
        item_id: &ItemId,
        marketplace: MarketplaceId,
        since: OffsetDateTime,
    ) -> Vec<PriceRecord> {
        let Some(entry) = self.items.get(item_id) else {
            return Vec::new();
        };
        let Some(slot) = entry.get(&marketplace) else {
            return Vec::new();
        };
        slot.history
            .iter()
            .chain(std::iter::once(&slot.latest))
            .filter(|r| r.observed_at >= since)
            .cloned()
            .collect()
    }

    /// All item ids currently in the store.
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|e| e.key().clone()).collect()
    }

    /// Number of items tracked.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Record a successful poll for a marketplace.
    pub fn record_success(&self, marketplace: MarketplaceId, at: OffsetDateTime) {
        let mut health = self.health.entry(marketplace).or_default();
        health.last_success = Some(at);
        health.consecutive_failures = 0;
        health.last_error = None;
    }

    /// Record a failed poll for a marketplace. Does not touch any price
    /// record: the previous latest stays and goes stale on its own.
    pub fn record_failure(&self, marketplace: MarketplaceId, error: &str, at: OffsetDateTime) {
        let mut health = self.health.entry(marketplace).or_default();
        health.last_failure = Some(at);
        health.last_error = Some(error.to_string());
        health.consecutive_failures += 1;
    }

    /// Health snapshot for one marketplace.
    pub fn health(&self, marketplace: MarketplaceId) -> MarketplaceHealth {
        self.health
            .get(&marketplace)
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Health snapshots for all marketplaces that have polled.
    pub fn all_health(&self) -> HashMap<MarketplaceId, MarketplaceHealth> {
        self.health
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }
}

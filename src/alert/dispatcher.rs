//! Opportunity alert deduplication and dispatch.
//!
//! The detector re-emits every live opportunity each pass; the dispatcher
//! decides which of them are news. An opportunity alerts when first seen,
//! when its profit moves by more than the configured delta, or when the
//! cooldown expires. When an opportunity disappears its dedup state is
//! dropped, so a later recurrence alerts as new.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::config::Config;
use crate::detector::{Opportunity, OpportunityKey};
use crate::metrics;

use super::notifier::Notifier;

/// Dedup state for one active opportunity.
#[derive(Debug, Clone)]
struct AlertState {
    last_alerted_profit: i64,
    last_alerted_at: OffsetDateTime,
}

/// Why an opportunity alerted (or did not).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDecision {
    /// First sighting of this (item, buy, sell) triple.
    New,
    /// Profit moved beyond the re-alert delta.
    ProfitMoved,
    /// Cooldown elapsed while the opportunity stayed live.
    CooldownExpired,
    /// Still live but nothing newsworthy.
    Suppressed,
}

/// Routes detector output to notifiers, deduplicating repeats.
pub struct Dispatcher {
    notifiers: Vec<Arc<dyn Notifier>>,
    realert_delta: i64,
    cooldown: time::Duration,
    states: Mutex<HashMap<OpportunityKey, AlertState>>,
}

impl Dispatcher {
    /// Create a dispatcher from configuration and delivery channels.
    pub fn new(config: &Config, notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self {
            notifiers,
            realert_delta: config.realert_delta,
            cooldown: time::Duration::seconds(config.realert_cooldown_secs as i64),
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Process one detection pass: decide, update state, deliver alerts.
    pub async fn dispatch(&self, opportunities: &[Opportunity], now: OffsetDateTime) {
        let decisions = self.decide(opportunities, now);
        for (opportunity, decision) in opportunities.iter().zip(&decisions) {
            match decision {
                AlertDecision::Suppressed => {
                    metrics::inc_alerts_suppressed();
                    debug!(
                        item_id = %opportunity.item_id,
                        buy = %opportunity.buy_marketplace,
                        sell = %opportunity.sell_marketplace,
                        "Alert suppressed"
                    );
                }
                _ => {
                    metrics::inc_alerts_dispatched();
                    for notifier in &self.notifiers {
                        if let Err(error) = notifier.notify(opportunity).await {
                            warn!(
                                channel = notifier.name(),
                                %error,
                                "Alert delivery failed"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Decide per opportunity and update dedup state. Split from delivery
    /// so the state machine is testable without notifiers.
    pub fn decide(&self, opportunities: &[Opportunity], now: OffsetDateTime) -> Vec<AlertDecision> {
        let mut states = self.states.lock().expect("dispatcher state lock poisoned");

        let decisions: Vec<AlertDecision> = opportunities
            .iter()
            .map(|opp| {
                let key = opp.key();
                let decision = match states.get(&key) {
                    None => AlertDecision::New,
                    Some(state) => {
                        if (opp.net_profit - state.last_alerted_profit).abs() > self.realert_delta {
                            AlertDecision::ProfitMoved
                        } else if now - state.last_alerted_at >= self.cooldown {
                            AlertDecision::CooldownExpired
                        } else {
                            AlertDecision::Suppressed
                        }
                    }
                };
                if decision != AlertDecision::Suppressed {
                    states.insert(
                        key,
                        AlertState {
                            last_alerted_profit: opp.net_profit,
                            last_alerted_at: now,
                        },
                    );
                }
                decision
            })
            .collect();

        // Opportunities that vanished forget their state, so they alert
        // again when they come back.
        let live: std::collections::HashSet<OpportunityKey> =
            opportunities.iter().map(|o| o.key()).collect();
        states.retain(|key, _| live.contains(key));

        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use crate::catalog::ItemId;
    use crate::marketplace::MarketplaceId;

    const NOW: OffsetDateTime = datetime!(2026-01-01 12:00 UTC);

    fn opportunity(net_profit: i64) -> Opportunity {
        Opportunity {
            item_id: ItemId("ak-47|redline|field-tested".to_string()),
            buy_marketplace: MarketplaceId::CsFloat,
            sell_marketplace: MarketplaceId::Steam,
            buy_price: 1_000,
            sell_price: 1_350,
            net_profit,
            net_profit_bps: (net_profit * 10) as u32,
            detected_at: NOW,
            input_staleness_secs: 0,
        }
    }

    fn dispatcher() -> Dispatcher {
        // realert_delta 100, cooldown 900s.
        Dispatcher::new(&Config::default(), Vec::new())
    }

    #[test]
    fn first_sighting_alerts() {
        let dispatcher = dispatcher();
        let decisions = dispatcher.decide(&[opportunity(147)], NOW);
        assert_eq!(decisions, vec![AlertDecision::New]);
    }

    #[test]
    fn unchanged_opportunity_is_suppressed_within_cooldown() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(147)], NOW);

        let later = NOW + time::Duration::minutes(5);
        let decisions = dispatcher.decide(&[opportunity(147)], later);
        assert_eq!(decisions, vec![AlertDecision::Suppressed]);
    }

    #[test]
    fn small_profit_drift_is_suppressed() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(147)], NOW);

        let decisions = dispatcher.decide(&[opportunity(150)], NOW + time::Duration::minutes(1));
        assert_eq!(decisions, vec![AlertDecision::Suppressed]);
    }

    #[test]
    fn large_profit_move_realerts() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(147)], NOW);

        let decisions = dispatcher.decide(&[opportunity(300)], NOW + time::Duration::minutes(1));
        assert_eq!(decisions, vec![AlertDecision::ProfitMoved]);

        // The move resets the baseline: drifting back a little stays quiet.
        let decisions = dispatcher.decide(&[opportunity(290)], NOW + time::Duration::minutes(2));
        assert_eq!(decisions, vec![AlertDecision::Suppressed]);
    }

    #[test]
    fn profit_drop_beyond_delta_also_realerts() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(300)], NOW);

        let decisions = dispatcher.decide(&[opportunity(150)], NOW + time::Duration::minutes(1));
        assert_eq!(decisions, vec![AlertDecision::ProfitMoved]);
    }

    #[test]
    fn cooldown_expiry_realerts_unchanged_opportunity() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(147)], NOW);

        let past_cooldown = NOW + time::Duration::minutes(16);
        let decisions = dispatcher.decide(&[opportunity(147)], past_cooldown);
        assert_eq!(decisions, vec![AlertDecision::CooldownExpired]);
    }

    #[test]
    fn disappearance_clears_state_so_recurrence_alerts() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(147)], NOW);

        // Spread collapses: empty pass drops the state.
        dispatcher.decide(&[], NOW + time::Duration::minutes(1));

        let decisions = dispatcher.decide(&[opportunity(147)], NOW + time::Duration::minutes(2));
        assert_eq!(decisions, vec![AlertDecision::New]);
    }

    #[test]
    fn suppressed_pass_does_not_extend_cooldown() {
        let dispatcher = dispatcher();
        dispatcher.decide(&[opportunity(147)], NOW);

        // Seen again mid-cooldown, suppressed; the original alert time
        // still governs expiry.
        dispatcher.decide(&[opportunity(147)], NOW + time::Duration::minutes(10));
        let decisions = dispatcher.decide(&[opportunity(147)], NOW + time::Duration::minutes(15));
        assert_eq!(decisions, vec![AlertDecision::CooldownExpired]);
    }
}

//! Marketplace-specific item names resolved to canonical identities.

use std::collections::HashMap;
use std::str::FromStr;

use dashmap::{DashMap, DashSet};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::marketplace::MarketplaceId;
use crate::metrics;

use super::types::{CanonicalItem, ItemId, Wear};

/// `Weapon | Skin (Wear)` descriptor shape shared by every marketplace.
static DESCRIPTOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<weapon>[^|]+?)\s*\|\s*(?P<skin>.+?)\s*\((?P<wear>[^()]+)\)$")
        .expect("descriptor regex is valid")
});

/// Resolves raw marketplace item descriptors to canonical item identities.
///
/// Resolution is deterministic and idempotent: the same descriptor (or any
/// known alias of it) always yields the same [`ItemId`]. Descriptors that
/// cannot be parsed are quarantined and excluded from detection; they are
/// never guessed into a wrong mapping.
pub struct Resolver {
    /// Known alias spellings, normalized-lowercase -> canonical descriptor.
    aliases: HashMap<String, String>,
    /// Canonical items seen so far, keyed by item id.
    catalog: DashMap<ItemId, CanonicalItem>,
    /// Descriptors that failed to resolve, kept for the dashboard.
    quarantined: DashSet<String>,
}

impl Resolver {
    /// Create a resolver with an empty alias table.
    pub fn new() -> Self {
        Self::with_aliases(HashMap::new())
    }

    /// Create a resolver with a configured alias table.
    ///
    /// Keys are matched case-insensitively against incoming descriptors;
    /// values must be descriptors in the canonical
    /// `Weapon | Skin (Wear)` spelling.
    pub fn with_aliases(aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(k, v)| (normalize_whitespace(&k).to_lowercase(), v))
            .collect();
        Self {
            aliases,
            catalog: DashMap::new(),
            quarantined: DashSet::new(),
        }
    }

    /// Resolve a raw marketplace descriptor to a canonical item.
    ///
    /// On first sighting the item is recorded in the catalog; later
    /// sightings may correct `display_name` casing but nothing else.
    pub fn resolve(
        &self,
        marketplace: MarketplaceId,
        raw_descriptor: &str,
    ) -> Result<CanonicalItem, ResolveError> {
        match self.parse(raw_descriptor) {
            Ok(item) => {
                self.record(item.clone());
                Ok(item)
            }
            Err(e) => {
                // Warn once per descriptor; repeats only count.
                if self.quarantined.insert(raw_descriptor.to_string()) {
                    warn!(
                        marketplace = %marketplace,
                        descriptor = raw_descriptor,
                        error = %e,
                        "Quarantining unresolvable item descriptor"
                    );
                }
                metrics::inc_items_quarantined();
                Err(e)
            }
        }
    }

    fn parse(&self, raw_descriptor: &str) -> Result<CanonicalItem, ResolveError> {
        let cleaned = normalize_whitespace(raw_descriptor);
        if cleaned.is_empty() {
            return Err(ResolveError::EmptyDescriptor);
        }

        // Alias table first, so marketplace-specific spellings collapse
        // onto the canonical one before parsing.
        let canonical = match self.aliases.get(&cleaned.to_lowercase()) {
            Some(target) => target.clone(),
            None => cleaned,
        };

        let (stripped, stattrak, souvenir) = strip_flags(&canonical);
        if stripped.is_empty() {
            return Err(ResolveError::EmptyDescriptor);
        }

        let caps = DESCRIPTOR_RE
            .captures(&stripped)
            .ok_or_else(|| ResolveError::Unparseable(canonical.clone()))?;

        let weapon = caps["weapon"].trim().to_string();
        let skin = caps["skin"].trim().to_string();
        let wear_token = caps["wear"].trim();
        let wear = parse_wear(wear_token).ok_or_else(|| ResolveError::UnknownWear {
            wear: wear_token.to_string(),
            descriptor: canonical.clone(),
        })?;

        let item_id = ItemId::compose(&weapon, &skin, wear, stattrak, souvenir);
        let mut display_name = String::new();
        if stattrak {
            display_name.push_str("StatTrak\u{2122} ");
        }
        if souvenir {
            display_name.push_str("Souvenir ");
        }
        display_name.push_str(&format!("{} | {} ({})", weapon, skin, wear));

        Ok(CanonicalItem {
            item_id,
            display_name,
            weapon,
            skin_name: skin,
            wear,
            stattrak,
            souvenir,
        })
    }

    fn record(&self, item: CanonicalItem) {
        match self.catalog.entry(item.item_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(mut existing) => {
                // display_name correction only; identity attributes are
                // immutable after first sighting.
                if existing.get().display_name != item.display_name {
                    debug!(
                        item_id = %item.item_id,
                        old = existing.get().display_name,
                        new = item.display_name,
                        "Correcting display name"
                    );
                    existing.get_mut().display_name = item.display_name;
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }

    /// Parse a descriptor without recording or quarantining anything.
    ///
    /// Used for ad-hoc queries, where a typo should not pollute the
    /// quarantine list.
    pub fn lookup(&self, raw_descriptor: &str) -> Result<CanonicalItem, ResolveError> {
        self.parse(raw_descriptor)
    }

    /// Look up a previously-seen canonical item.
    pub fn get(&self, item_id: &ItemId) -> Option<CanonicalItem> {
        self.catalog.get(item_id).map(|e| e.clone())
    }

    /// Number of canonical items seen so far.
    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    /// Snapshot of quarantined descriptors, for the dashboard.
    pub fn quarantined(&self) -> Vec<String> {
        self.quarantined.iter().map(|d| d.clone()).collect()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse runs of whitespace and trim.
fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip StatTrak/Souvenir markers and cosmetic stars off a descriptor.
///
/// Prefixes are matched case-insensitively on the descriptor itself, never
/// against a lowercased copy whose byte offsets may not line up with the
/// original once non-ASCII characters are involved.
fn strip_flags(descriptor: &str) -> (String, bool, bool) {
    let mut rest = descriptor.trim();
    let mut stattrak = false;
    let mut souvenir = false;

    loop {
        if let Some(tail) = strip_prefix_ignore_ascii_case(rest, "StatTrak\u{2122}")
            .or_else(|| strip_prefix_ignore_ascii_case(rest, "StatTrak"))
        {
            stattrak = true;
            rest = tail.trim_start();
        } else if let Some(tail) = strip_prefix_ignore_ascii_case(rest, "Souvenir") {
            souvenir = true;
            rest = tail.trim_start();
        } else if let Some(tail) = rest.strip_prefix('\u{2605}') {
            // Knife/glove star decoration.
            rest = tail.trim_start();
        } else {
            break;
        }
    }

    (rest.to_string(), stattrak, souvenir)
}

/// `str::strip_prefix` with ASCII-case-insensitive matching. Non-ASCII
/// characters in the prefix (the trademark sign) must match exactly.
fn strip_prefix_ignore_ascii_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Parse a wear token, tolerating hyphen/space spelling differences
/// ("Field Tested" vs "Field-Tested").
fn parse_wear(token: &str) -> Option<Wear> {
    Wear::from_str(token)
        .or_else(|_| Wear::from_str(&token.replace(' ', "-")))
        .or_else(|_| Wear::from_str(&token.replace('-', " ")))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(resolver: &Resolver, raw: &str) -> CanonicalItem {
        resolver.resolve(MarketplaceId::CsFloat, raw).unwrap()
    }

    #[test]
    fn resolves_plain_descriptor() {
        let resolver = Resolver::new();
        let item = resolve(&resolver, "AK-47 | Redline (Field-Tested)");

        assert_eq!(item.item_id.as_str(), "ak-47|redline|field-tested");
        assert_eq!(item.weapon, "AK-47");
        assert_eq!(item.skin_name, "Redline");
        assert_eq!(item.wear, Wear::FieldTested);
        assert!(!item.stattrak);
        assert!(!item.souvenir);
    }

    #[test]
    fn resolves_stattrak_and_souvenir_flags() {
        let resolver = Resolver::new();
        let st = resolve(&resolver, "StatTrak\u{2122} AK-47 | Redline (Field-Tested)");
        let sv = resolve(&resolver, "Souvenir AWP | Dragon Lore (Factory New)");

        assert!(st.stattrak);
        assert_eq!(st.item_id.as_str(), "st:ak-47|redline|field-tested");
        assert!(sv.souvenir);
        assert_eq!(sv.item_id.as_str(), "sv:awp|dragon lore|factory-new");
    }

    #[test]
    fn flag_stripping_survives_width_changing_characters() {
        // U+0130 lowercases to two chars; flag stripping must not derive
        // byte offsets from a lowercased copy of the descriptor.
        let resolver = Resolver::new();
        let item = resolve(&resolver, "StatTrak\u{2122} \u{130}K-47 | Redline (Field-Tested)");
        assert!(item.stattrak);
        assert_eq!(item.weapon, "\u{130}K-47");

        // Case-insensitive prefix matching still holds.
        let lower = resolve(&resolver, "stattrak\u{2122} AK-47 | Redline (Field-Tested)");
        assert!(lower.stattrak);
    }

    #[test]
    fn resolution_is_idempotent() {
        let resolver = Resolver::new();
        let first = resolve(&resolver, "AK-47 | Redline (Field-Tested)");
        let second = resolve(&resolver, "AK-47 | Redline (Field-Tested)");
        assert_eq!(first.item_id, second.item_id);
        assert_eq!(resolver.catalog_len(), 1);
    }

    #[test]
    fn aliases_commute_with_resolution() {
        let mut aliases = HashMap::new();
        aliases.insert(
            "ak47 redline ft".to_string(),
            "AK-47 | Redline (Field-Tested)".to_string(),
        );
        let resolver = Resolver::with_aliases(aliases);

        let direct = resolve(&resolver, "AK-47 | Redline (Field-Tested)");
        let via_alias = resolve(&resolver, "AK47 Redline FT");
        assert_eq!(direct.item_id, via_alias.item_id);
    }

    #[test]
    fn tolerates_spacing_and_wear_spelling_differences() {
        let resolver = Resolver::new();
        let a = resolve(&resolver, "AK-47  |  Redline  (Field-Tested)");
        let b = resolve(&resolver, "AK-47 | Redline (Field Tested)");
        assert_eq!(a.item_id, b.item_id);
    }

    #[test]
    fn unresolvable_descriptors_are_quarantined() {
        let resolver = Resolver::new();
        let err = resolver
            .resolve(MarketplaceId::Steam, "Operation Bravo Case")
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unparseable(_)));
        assert_eq!(resolver.quarantined(), vec!["Operation Bravo Case"]);
        assert_eq!(resolver.catalog_len(), 0);
    }

    #[test]
    fn unknown_wear_is_rejected_not_guessed() {
        let resolver = Resolver::new();
        let err = resolver
            .resolve(MarketplaceId::Steam, "AK-47 | Redline (Mint)")
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownWear { .. }));
    }

    #[test]
    fn display_name_correction_keeps_identity() {
        let resolver = Resolver::new();
        let first = resolve(&resolver, "ak-47 | redline (field-tested)");
        let second = resolve(&resolver, "AK-47 | Redline (Field-Tested)");

        assert_eq!(first.item_id, second.item_id);
        let stored = resolver.get(&first.item_id).unwrap();
        assert_eq!(stored.display_name, "AK-47 | Redline (Field-Tested)");
    }
}

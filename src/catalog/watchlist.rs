//! Built-in watchlist of commonly traded skins.
//!
//! Used when no watchlist file is configured. Names use the canonical
//! `Weapon | Skin (Wear)` spelling so they resolve without aliases.

/// Default set of items to poll across marketplaces.
pub fn default_watchlist() -> Vec<String> {
    DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect()
}

const DEFAULT_WATCHLIST: &[&str] = &[
    "AK-47 | Redline (Field-Tested)",
    "AK-47 | Asiimov (Field-Tested)",
    "AK-47 | Vulcan (Minimal Wear)",
    "AK-47 | Slate (Factory New)",
    "AK-47 | Bloodsport (Minimal Wear)",
    "AWP | Asiimov (Field-Tested)",
    "AWP | Redline (Field-Tested)",
    "AWP | Wildfire (Minimal Wear)",
    "AWP | Neo-Noir (Factory New)",
    "AWP | Hyper Beast (Field-Tested)",
    "M4A4 | Asiimov (Field-Tested)",
    "M4A4 | Neo-Noir (Minimal Wear)",
    "M4A4 | Desolate Space (Factory New)",
    "M4A1-S | Hyper Beast (Minimal Wear)",
    "M4A1-S | Printstream (Field-Tested)",
    "M4A1-S | Golden Coil (Minimal Wear)",
    "Desert Eagle | Blaze (Factory New)",
    "Desert Eagle | Printstream (Field-Tested)",
    "Desert Eagle | Code Red (Minimal Wear)",
    "USP-S | Kill Confirmed (Field-Tested)",
    "USP-S | Neo-Noir (Minimal Wear)",
    "Glock-18 | Fade (Factory New)",
    "Glock-18 | Water Elemental (Minimal Wear)",
    "P250 | Asiimov (Field-Tested)",
    "StatTrak\u{2122} AK-47 | Redline (Field-Tested)",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Resolver;
    use crate::marketplace::MarketplaceId;

    #[test]
    fn every_default_entry_resolves() {
        let resolver = Resolver::new();
        for name in default_watchlist() {
            resolver
                .resolve(MarketplaceId::CsFloat, &name)
                .unwrap_or_else(|e| panic!("{name:?} failed to resolve: {e}"));
        }
        assert!(resolver.quarantined().is_empty());
    }
}

//! Canonical item identity types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Stable, marketplace-independent item key.
///
/// Composed deterministically from normalized attributes: optional
/// `st:`/`sv:` flag prefixes, then `weapon|skin|wear`, all lowercase.
/// Two listings describing the same physical item variant always produce
/// the same `ItemId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Compose an item id from normalized parts.
    pub fn compose(weapon: &str, skin: &str, wear: Wear, stattrak: bool, souvenir: bool) -> Self {
        let mut id = String::new();
        if stattrak {
            id.push_str("st:");
        }
        if souvenir {
            id.push_str("sv:");
        }
        id.push_str(&weapon.to_lowercase());
        id.push('|');
        id.push_str(&skin.to_lowercase());
        id.push('|');
        id.push_str(wear.slug());
        ItemId(id)
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exterior/wear condition tier of a skin.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Wear {
    /// Factory New.
    #[strum(to_string = "Factory New", serialize = "factory-new", serialize = "fn")]
    #[serde(rename = "Factory New")]
    FactoryNew,
    /// Minimal Wear.
    #[strum(to_string = "Minimal Wear", serialize = "minimal-wear", serialize = "mw")]
    #[serde(rename = "Minimal Wear")]
    MinimalWear,
    /// Field-Tested.
    #[strum(to_string = "Field-Tested", serialize = "field-tested", serialize = "ft")]
    #[serde(rename = "Field-Tested")]
    FieldTested,
    /// Well-Worn.
    #[strum(to_string = "Well-Worn", serialize = "well-worn", serialize = "ww")]
    #[serde(rename = "Well-Worn")]
    WellWorn,
    /// Battle-Scarred.
    #[strum(to_string = "Battle-Scarred", serialize = "battle-scarred", serialize = "bs")]
    #[serde(rename = "Battle-Scarred")]
    BattleScarred,
}

impl Wear {
    /// Lowercase slug used inside `ItemId`s.
    pub fn slug(&self) -> &'static str {
        match self {
            Wear::FactoryNew => "factory-new",
            Wear::MinimalWear => "minimal-wear",
            Wear::FieldTested => "field-tested",
            Wear::WellWorn => "well-worn",
            Wear::BattleScarred => "battle-scarred",
        }
    }
}

/// A canonical item variant, created by the resolver on first sighting.
///
/// Immutable after creation except `display_name`, which may be corrected
/// when a better-cased spelling is observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalItem {
    /// Stable item key.
    pub item_id: ItemId,
    /// Human-readable name, e.g. "AK-47 | Redline (Field-Tested)".
    pub display_name: String,
    /// Weapon name, e.g. "AK-47".
    pub weapon: String,
    /// Skin name, e.g. "Redline".
    pub skin_name: String,
    /// Exterior tier.
    pub wear: Wear,
    /// StatTrak variant flag.
    pub stattrak: bool,
    /// Souvenir variant flag.
    pub souvenir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn item_id_composition_is_deterministic() {
        let a = ItemId::compose("AK-47", "Redline", Wear::FieldTested, false, false);
        let b = ItemId::compose("ak-47", "REDLINE", Wear::FieldTested, false, false);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "ak-47|redline|field-tested");
    }

    #[test]
    fn item_id_flags_distinguish_variants() {
        let plain = ItemId::compose("AK-47", "Redline", Wear::FieldTested, false, false);
        let st = ItemId::compose("AK-47", "Redline", Wear::FieldTested, true, false);
        let sv = ItemId::compose("AK-47", "Redline", Wear::FieldTested, false, true);
        assert_ne!(plain, st);
        assert_ne!(plain, sv);
        assert_ne!(st, sv);
        assert_eq!(st.as_str(), "st:ak-47|redline|field-tested");
    }

    #[test]
    fn wear_from_string_accepts_aliases() {
        assert_eq!(Wear::from_str("Field-Tested").unwrap(), Wear::FieldTested);
        assert_eq!(Wear::from_str("field-tested").unwrap(), Wear::FieldTested);
        assert_eq!(Wear::from_str("ft").unwrap(), Wear::FieldTested);
        assert_eq!(Wear::from_str("Factory New").unwrap(), Wear::FactoryNew);
        assert!(Wear::from_str("pristine").is_err());
    }
}

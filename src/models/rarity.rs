use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::PROBABILITY_TOLERANCE;
use crate::error::{BoosterError, Result};

// ---------------------------------------------------------------------------
// Rarity
// ---------------------------------------------------------------------------

/// Drop tier of a card, ordered from least to most rare.
///
/// `Leader` sits between `Rare` and `SuperRare`; it is printed as its own tier
/// but counts as "rare or better" for pack guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Leader,
    SuperRare,
    SecretRare,
}

impl Rarity {
    /// Every tier in draw order.
    pub const ALL: [Rarity; 6] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Leader,
        Rarity::SuperRare,
        Rarity::SecretRare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Leader => "leader",
            Rarity::SuperRare => "super_rare",
            Rarity::SecretRare => "secret_rare",
        }
    }

    pub fn is_rare_or_better(&self) -> bool {
        *self >= Rarity::Rare
    }

    /// Tiers the presentation layer gives a special reveal.
    pub fn is_special(&self) -> bool {
        matches!(self, Rarity::SuperRare | Rarity::SecretRare)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = BoosterError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        Rarity::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| BoosterError::InvalidArgument(format!("Unknown rarity: {}", s)))
    }
}

// ---------------------------------------------------------------------------
// RarityTable
// ---------------------------------------------------------------------------

/// Drop probability per rarity tier.
///
/// Built through [`RarityTable::new`], which rejects tables whose
/// probabilities are out of range or do not sum to 1.0 within
/// [`PROBABILITY_TOLERANCE`]. Tiers absent from the table never drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Rarity, f64>", into = "BTreeMap<Rarity, f64>")]
pub struct RarityTable {
    entries: BTreeMap<Rarity, f64>,
}

impl RarityTable {
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Rarity, f64)>,
    {
        let table = Self {
            entries: entries.into_iter().collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Check every probability is within `[0, 1]` and the total is ~1.0.
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(BoosterError::Configuration(
                "Rarity table has no entries".to_string(),
            ));
        }
        for (rarity, &p) in &self.entries {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(BoosterError::Configuration(format!(
                    "Probability for {} must be within [0, 1], got {}",
                    rarity, p
                )));
            }
        }
        let total = self.total();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(BoosterError::Configuration(format!(
                "Rarity probabilities sum to {}, expected 1.0",
                total
            )));
        }
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.entries.values().sum()
    }

    pub fn probability(&self, rarity: Rarity) -> f64 {
        self.entries.get(&rarity).copied().unwrap_or(0.0)
    }

    /// Tiers with their probabilities, least rare first.
    pub fn iter(&self) -> impl Iterator<Item = (Rarity, f64)> + '_ {
        self.entries.iter().map(|(&r, &p)| (r, p))
    }

    /// Tiers that can actually drop.
    pub fn tiers(&self) -> Vec<Rarity> {
        self.iter().filter(|(_, p)| *p > 0.0).map(|(r, _)| r).collect()
    }

    /// Map a roll `u` in `[0, 1)` onto a tier by walking cumulative bounds.
    ///
    /// Returns the first tier whose cumulative bound exceeds `u`. A roll that
    /// lands past every bound (possible when the total is just under 1.0)
    /// resolves to the rarest tier with a non-zero probability.
    pub fn rarity_for_roll(&self, u: f64) -> Option<Rarity> {
        let mut cumulative = 0.0;
        let mut last_droppable = None;
        for (rarity, p) in self.iter() {
            if p <= 0.0 {
                continue;
            }
            cumulative += p;
            last_droppable = Some(rarity);
            if cumulative > u {
                return Some(rarity);
            }
        }
        last_droppable
    }
}

impl Default for RarityTable {
    fn default() -> Self {
        Self {
            entries: BTreeMap::from([
                (Rarity::Common, 0.60),
                (Rarity::Uncommon, 0.25),
                (Rarity::Rare, 0.10),
                (Rarity::SuperRare, 0.04),
                (Rarity::SecretRare, 0.01),
            ]),
        }
    }
}

impl TryFrom<BTreeMap<Rarity, f64>> for RarityTable {
    type Error = BoosterError;

    fn try_from(entries: BTreeMap<Rarity, f64>) -> Result<Self> {
        RarityTable::new(entries)
    }
}

impl From<RarityTable> for BTreeMap<Rarity, f64> {
    fn from(table: RarityTable) -> Self {
        table.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rarity_order_places_leader_between_rare_and_super_rare() {
        assert!(Rarity::Rare < Rarity::Leader);
        assert!(Rarity::Leader < Rarity::SuperRare);
        assert!(Rarity::Leader.is_rare_or_better());
        assert!(!Rarity::Uncommon.is_rare_or_better());
    }

    #[test]
    fn rarity_parses_display_names() {
        assert_eq!("Super Rare".parse::<Rarity>().unwrap(), Rarity::SuperRare);
        assert_eq!("secret-rare".parse::<Rarity>().unwrap(), Rarity::SecretRare);
        assert!("mythic".parse::<Rarity>().is_err());
    }

    #[test]
    fn default_table_is_valid() {
        let table = RarityTable::default();
        table.validate().unwrap();
        assert_eq!(table.probability(Rarity::Leader), 0.0);
    }

    #[test]
    fn zero_probability_tier_is_skipped() {
        let table = RarityTable::new([
            (Rarity::Common, 0.5),
            (Rarity::Uncommon, 0.0),
            (Rarity::Rare, 0.5),
        ])
        .unwrap();
        assert_eq!(table.rarity_for_roll(0.5), Some(Rarity::Rare));
        assert_eq!(table.tiers(), vec![Rarity::Common, Rarity::Rare]);
    }

    #[test]
    fn deserialize_rejects_bad_total() {
        let err = serde_json::from_str::<RarityTable>(r#"{"common": 0.5, "rare": 0.2}"#);
        assert!(err.is_err());
    }
}

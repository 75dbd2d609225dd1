//! Derived statistics over packs and collections.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{CardDefinition, Rarity, UserCardEntry};

/// Count cards per rarity.
pub fn rarity_breakdown<'a, I>(cards: I) -> BTreeMap<Rarity, usize>
where
    I: IntoIterator<Item = &'a CardDefinition>,
{
    let mut counts = BTreeMap::new();
    for card in cards {
        *counts.entry(card.rarity).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// PackSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackSummary {
    pub size: usize,
    pub counts: BTreeMap<Rarity, usize>,
    /// Rarest tier drawn, `None` for an empty pack.
    pub best: Option<Rarity>,
    pub special: usize,
}

impl PackSummary {
    /// Whether the pack holds at least one card at or above `floor`.
    pub fn meets_floor(&self, floor: Rarity) -> bool {
        self.best.is_some_and(|best| best >= floor)
    }
}

pub fn pack_summary(rarities: &[Rarity]) -> PackSummary {
    let mut counts = BTreeMap::new();
    for &rarity in rarities {
        *counts.entry(rarity).or_insert(0) += 1;
    }
    PackSummary {
        size: rarities.len(),
        best: rarities.iter().max().copied(),
        special: rarities.iter().filter(|r| r.is_special()).count(),
        counts,
    }
}

// ---------------------------------------------------------------------------
// CollectionCompletion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TierProgress {
    pub owned: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionCompletion {
    pub owned_unique: usize,
    pub total: usize,
    /// Owned share of the catalog in percent, `0.0` for an empty catalog.
    pub percent: f64,
    pub by_rarity: BTreeMap<Rarity, TierProgress>,
    /// Copies beyond the first, summed over owned cards.
    pub duplicates: u64,
    pub favorites: usize,
}

/// Completion of a collection against the catalog, optionally restricted to
/// the cards of one booster.
///
/// Entries for ids outside the scope (or unknown to the catalog) and entries
/// with a zero quantity are ignored.
pub fn collection_completion(
    catalog: &Catalog,
    entries: &[UserCardEntry],
    booster_id: Option<&str>,
) -> CollectionCompletion {
    let scope: Vec<&CardDefinition> = match booster_id {
        Some(id) => catalog.cards_for_booster(id),
        None => catalog.cards().iter().collect(),
    };
    let in_scope: HashSet<&str> = scope.iter().map(|c| c.id.as_str()).collect();

    let mut by_rarity: BTreeMap<Rarity, TierProgress> = BTreeMap::new();
    for card in &scope {
        by_rarity.entry(card.rarity).or_default().total += 1;
    }

    let mut owned = HashSet::new();
    let mut duplicates = 0u64;
    let mut favorites = 0;
    for entry in entries {
        if entry.quantity == 0 || !in_scope.contains(entry.card_id.as_str()) {
            continue;
        }
        if !owned.insert(entry.card_id.as_str()) {
            duplicates += u64::from(entry.quantity);
            continue;
        }
        duplicates += u64::from(entry.quantity - 1);
        if entry.is_favorite {
            favorites += 1;
        }
        if let Some(card) = catalog.card(&entry.card_id) {
            by_rarity.entry(card.rarity).or_default().owned += 1;
        }
    }

    let total = scope.len();
    let percent = if total == 0 {
        0.0
    } else {
        owned.len() as f64 * 100.0 / total as f64
    };

    CollectionCompletion {
        owned_unique: owned.len(),
        total,
        percent,
        by_rarity,
        duplicates,
        favorites,
    }
}

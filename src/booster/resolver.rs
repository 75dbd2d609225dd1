//! Rarity resolver.
//!
//! Draws rarity tiers from a [`RarityTable`], applies the per-pack floor
//! guarantee and maps each tier onto a concrete card picked uniformly from the
//! catalog pool for `(booster_id, rarity)`.

use rand::prelude::*;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::DrawRules;
use crate::error::{BoosterError, Result};
use crate::models::{Rarity, RarityTable};

/// Draw a single rarity tier.
///
/// Rolls `u` in `[0, 1)` and returns the first tier (least rare first) whose
/// cumulative probability exceeds it.
pub fn draw_rarity<R: Rng + ?Sized>(table: &RarityTable, rng: &mut R) -> Result<Rarity> {
    table.validate()?;
    let u: f64 = rng.gen();
    table.rarity_for_roll(u).ok_or_else(|| {
        BoosterError::Configuration("Rarity table has no droppable tier".to_string())
    })
}

/// Draw `size` independent rarity tiers for one pack.
///
/// When `guarantee_min_rarity` is set and no draw reached it, the last slot
/// is upgraded to the floor. The other slots are left untouched.
pub fn draw_pack<R: Rng + ?Sized>(
    table: &RarityTable,
    booster_id: &str,
    size: usize,
    guarantee_min_rarity: Option<Rarity>,
    rng: &mut R,
) -> Result<Vec<Rarity>> {
    table.validate()?;

    let mut rarities = Vec::with_capacity(size);
    for _ in 0..size {
        rarities.push(draw_rarity(table, rng)?);
    }

    if let Some(floor) = guarantee_min_rarity {
        if !rarities.iter().any(|r| *r >= floor) {
            if let Some(last) = rarities.last_mut() {
                tracing::debug!(booster_id, from = %last, to = %floor, "upgrading last slot to pack floor");
                *last = floor;
            }
        }
    }

    Ok(rarities)
}

/// Pick one card id per rarity from the catalog pool of `booster_id`.
///
/// Fails with [`BoosterError::EmptyPool`] as soon as a required pool is
/// empty; another rarity is never substituted.
pub fn resolve_card_ids<R: Rng + ?Sized>(
    rarities: &[Rarity],
    booster_id: &str,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<Vec<String>> {
    let mut ids = Vec::with_capacity(rarities.len());
    for &rarity in rarities {
        let pool = catalog.pool(booster_id, rarity);
        let card = pool.choose(rng).ok_or_else(|| BoosterError::EmptyPool {
            booster_id: booster_id.to_string(),
            rarity,
        })?;
        ids.push(card.id.clone());
    }
    Ok(ids)
}

// ---------------------------------------------------------------------------
// PackDraw
// ---------------------------------------------------------------------------

/// Outcome of drawing one pack: the tiers and the card ids they resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackDraw {
    pub booster_id: String,
    pub rarities: Vec<Rarity>,
    pub card_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// RarityResolver
// ---------------------------------------------------------------------------

/// Draws whole packs for the boosters of a catalog under a set of [`DrawRules`].
pub struct RarityResolver<'a> {
    catalog: &'a Catalog,
    rules: &'a DrawRules,
}

impl<'a> RarityResolver<'a> {
    pub fn new(catalog: &'a Catalog, rules: &'a DrawRules) -> Self {
        Self { catalog, rules }
    }

    pub fn rules(&self) -> &DrawRules {
        self.rules
    }

    /// Number of cards a pack of `booster_id` holds: the booster's
    /// `cardCount` when the catalog defines it, the rules' pack size otherwise.
    pub fn pack_size(&self, booster_id: &str) -> usize {
        self.catalog
            .booster(booster_id)
            .map(|b| b.card_count)
            .unwrap_or(self.rules.pack_size)
    }

    /// Open a single pack of `booster_id` with the thread-local RNG.
    pub fn open_pack(&self, booster_id: &str) -> Result<PackDraw> {
        self.open_pack_with(booster_id, &mut thread_rng())
    }

    /// Open a single pack of `booster_id` with a caller-provided RNG.
    pub fn open_pack_with<R: Rng + ?Sized>(&self, booster_id: &str, rng: &mut R) -> Result<PackDraw> {
        let booster = self.catalog.booster(booster_id).ok_or_else(|| {
            BoosterError::NotFound(format!("No booster definition for '{}'", booster_id))
        })?;

        let rarities = draw_pack(
            &self.rules.table,
            &booster.id,
            booster.card_count,
            self.rules.guarantee_min_rarity,
            rng,
        )?;
        let card_ids = resolve_card_ids(&rarities, &booster.id, self.catalog, rng)?;

        Ok(PackDraw {
            booster_id: booster.id.clone(),
            rarities,
            card_ids,
        })
    }

    /// Open `packs` packs of `booster_id`.
    pub fn open_box(&self, booster_id: &str, packs: usize) -> Result<Vec<PackDraw>> {
        let mut rng = thread_rng();
        let mut box_contents = Vec::with_capacity(packs);
        for _ in 0..packs {
            box_contents.push(self.open_pack_with(booster_id, &mut rng)?);
        }
        Ok(box_contents)
    }
}

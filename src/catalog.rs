//! Card and booster catalog.
//!
//! [`Catalog`] is the immutable, indexed view of every card and booster
//! definition. [`CatalogRepository`] owns its lifecycle: it is constructed
//! once, loads the catalog through the [`CacheManager`] on first use and hands
//! out shared `Arc<Catalog>` handles afterwards.

use std::cell::{OnceCell, RefCell};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use crate::cache::CacheManager;
use crate::error::{BoosterError, Result};
use crate::models::{BoosterPackDefinition, CardDefinition, Rarity};

#[derive(Deserialize)]
struct CatalogData {
    #[serde(default)]
    cards: Vec<CardDefinition>,
    #[serde(default)]
    boosters: Vec<BoosterPackDefinition>,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Read-only card/booster catalog with lookup indexes.
#[derive(Debug, Clone)]
pub struct Catalog {
    cards: Vec<CardDefinition>,
    boosters: Vec<BoosterPackDefinition>,
    card_index: HashMap<String, usize>,
    pools: HashMap<(String, Rarity), Vec<usize>>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate card or booster ids.
    pub fn new(cards: Vec<CardDefinition>, boosters: Vec<BoosterPackDefinition>) -> Result<Self> {
        let mut card_index = HashMap::with_capacity(cards.len());
        let mut pools: HashMap<(String, Rarity), Vec<usize>> = HashMap::new();

        for (idx, card) in cards.iter().enumerate() {
            if card_index.insert(card.id.clone(), idx).is_some() {
                return Err(BoosterError::Configuration(format!(
                    "Duplicate card id in catalog: {}",
                    card.id
                )));
            }
            pools
                .entry((card.booster_id.clone(), card.rarity))
                .or_default()
                .push(idx);
        }

        let mut seen = HashSet::new();
        for booster in &boosters {
            if !seen.insert(booster.id.as_str()) {
                return Err(BoosterError::Configuration(format!(
                    "Duplicate booster id in catalog: {}",
                    booster.id
                )));
            }
        }

        Ok(Self {
            cards,
            boosters,
            card_index,
            pools,
        })
    }

    /// Parse the catalog service payload `{ "cards": [...], "boosters": [...] }`.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let data: CatalogData = serde_json::from_value(value)?;
        Self::new(data.cards, data.boosters)
    }

    pub fn cards(&self) -> &[CardDefinition] {
        &self.cards
    }

    pub fn boosters(&self) -> &[BoosterPackDefinition] {
        &self.boosters
    }

    pub fn card(&self, id: &str) -> Option<&CardDefinition> {
        self.card_index.get(id).map(|&idx| &self.cards[idx])
    }

    pub fn contains_card(&self, id: &str) -> bool {
        self.card_index.contains_key(id)
    }

    /// Look up a booster by id, falling back to its code.
    pub fn booster(&self, id: &str) -> Option<&BoosterPackDefinition> {
        self.boosters
            .iter()
            .find(|b| b.id == id)
            .or_else(|| self.boosters.iter().find(|b| b.code.eq_ignore_ascii_case(id)))
    }

    /// Cards of one rarity that can drop from `booster_id`, in catalog order.
    pub fn pool(&self, booster_id: &str, rarity: Rarity) -> Vec<&CardDefinition> {
        self.pools
            .get(&(booster_id.to_string(), rarity))
            .map(|idxs| idxs.iter().map(|&i| &self.cards[i]).collect())
            .unwrap_or_default()
    }

    pub fn cards_for_booster(&self, booster_id: &str) -> Vec<&CardDefinition> {
        self.cards
            .iter()
            .filter(|c| c.booster_id == booster_id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CatalogRepository
// ---------------------------------------------------------------------------

/// Owner of the process-wide catalog.
///
/// Construct one at startup and pass it (or the `Arc<Catalog>` it returns) to
/// consumers. The catalog is loaded at most once; after that it is immutable.
pub struct CatalogRepository {
    cache: Option<RefCell<CacheManager>>,
    catalog: OnceCell<Arc<Catalog>>,
}

impl CatalogRepository {
    /// Repository that loads the catalog through `cache`.
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache: Some(RefCell::new(cache)),
            catalog: OnceCell::new(),
        }
    }

    /// Repository over an already built catalog, with no backing cache.
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            cache: None,
            catalog: OnceCell::from(Arc::new(catalog)),
        }
    }

    /// Load the catalog (downloading it if needed) and return a shared handle.
    ///
    /// Calling `load` again returns the already loaded catalog.
    pub fn load(&self) -> Result<Arc<Catalog>> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog.clone());
        }
        let cache = self.cache.as_ref().ok_or_else(|| {
            BoosterError::NotFound("Catalog repository has no backing cache".to_string())
        })?;
        let value = cache.borrow_mut().load_json("catalog")?;
        let catalog = Arc::new(Catalog::from_json(value)?);
        tracing::info!(
            cards = catalog.cards().len(),
            boosters = catalog.boosters().len(),
            "catalog loaded"
        );
        Ok(self.catalog.get_or_init(|| catalog).clone())
    }

    /// Like [`load`](Self::load), but borrows the catalog from the repository.
    pub fn load_ref(&self) -> Result<&Catalog> {
        self.load()?;
        self.catalog
            .get()
            .map(|c| c.as_ref())
            .ok_or_else(|| BoosterError::NotFound("Catalog not loaded".to_string()))
    }

    /// Return the loaded catalog, or `NotFound` before [`load`](Self::load).
    pub fn get(&self) -> Result<Arc<Catalog>> {
        self.catalog
            .get()
            .cloned()
            .ok_or_else(|| BoosterError::NotFound("Catalog not loaded; call load() first".to_string()))
    }

    pub fn is_loaded(&self) -> bool {
        self.catalog.get().is_some()
    }

    /// Check for a newer catalog version; if stale, clear the cache and
    /// forget the loaded catalog so the next [`load`](Self::load) fetches it.
    ///
    /// Handles already given out keep pointing at the previous catalog.
    pub fn refresh(&mut self) -> Result<bool> {
        let Some(cache) = self.cache.as_ref() else {
            return Ok(false);
        };
        let stale = {
            let mut cache = cache.borrow_mut();
            cache.invalidate_remote_version();
            cache.is_stale()?
        };
        if stale {
            cache.borrow().clear()?;
            self.catalog.take();
            tracing::info!("catalog was stale; cache cleared");
        }
        Ok(stale)
    }

    pub fn cache(&self) -> Option<std::cell::Ref<'_, CacheManager>> {
        self.cache.as_ref().map(|c| c.borrow())
    }
}

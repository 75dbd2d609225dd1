use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::{Rarity, RarityTable};

pub const DEFAULT_API_BASE: &str = "http://localhost:3000/api";

/// Cards printed per booster opening.
pub const DEFAULT_PACK_SIZE: usize = 5;

/// Allowed drift of a rarity table's total away from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

pub fn json_files() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("catalog", "catalog.json"),
        ("meta", "meta.json"),
    ])
}

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("booster-sdk")
    } else {
        PathBuf::from(".booster-sdk-cache")
    }
}

// ---------------------------------------------------------------------------
// DrawRules
// ---------------------------------------------------------------------------

/// Business rules applied to every booster draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawRules {
    #[serde(default)]
    pub table: RarityTable,
    #[serde(default = "default_pack_size")]
    pub pack_size: usize,
    /// At least one card per pack is at or above this rarity. A missing key
    /// keeps the `rare` floor; an explicit `null` disables it.
    #[serde(default = "default_guarantee")]
    pub guarantee_min_rarity: Option<Rarity>,
}

fn default_pack_size() -> usize {
    DEFAULT_PACK_SIZE
}

fn default_guarantee() -> Option<Rarity> {
    Some(Rarity::Rare)
}

impl Default for DrawRules {
    fn default() -> Self {
        Self {
            table: RarityTable::default(),
            pack_size: DEFAULT_PACK_SIZE,
            guarantee_min_rarity: default_guarantee(),
        }
    }
}

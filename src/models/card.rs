use serde::{Deserialize, Serialize};

use super::rarity::Rarity;

// ---------------------------------------------------------------------------
// CardDefinition — Static catalog entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub character: String,
    pub rarity: Rarity,

    // -- Game stats --
    pub cost: Option<i64>,
    pub power: Option<i64>,
    pub counter: Option<i64>,
    #[serde(default)]
    pub color: Vec<String>,
    #[serde(rename = "type")]
    pub type_field: Option<String>,

    /// Pack this card can drop from.
    #[serde(alias = "boosterId")]
    pub booster_id: String,

    // -- Images --
    #[serde(alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(alias = "imageSmall")]
    pub image_small: Option<String>,
}

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// UserCardEntry — Collection row owned by the collection service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserCardEntry {
    pub card_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub is_favorite: bool,
    pub obtained_at: Option<String>,
}

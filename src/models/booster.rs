use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// BoosterPackDefinition — Static catalog entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoosterPackDefinition {
    pub id: String,
    pub code: String,
    pub name: String,
    pub series: Option<String>,
    pub card_count: usize,
    pub description: Option<String>,
    pub release_date: Option<String>,
}

// ---------------------------------------------------------------------------
// OpenBoosterRequest / BoosterOpenResult — Booster service contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBoosterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booster_id: Option<String>,
}

impl OpenBoosterRequest {
    pub fn for_booster(booster_id: impl Into<String>) -> Self {
        Self {
            booster_id: Some(booster_id.into()),
        }
    }
}

/// Payload returned by one booster opening.
///
/// `cards` fixes the reveal order; `new_cards` lists the ids the user did not
/// own before this opening, as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterOpenResult {
    pub cards: Vec<String>,
    #[serde(default)]
    pub new_cards: Vec<String>,
    pub available_boosters_remaining: i64,
    pub next_refill_time: Option<String>,
}

impl BoosterOpenResult {
    pub fn is_new(&self, card_id: &str) -> bool {
        self.new_cards.iter().any(|id| id == card_id)
    }

    /// `new_cards` ids that do not appear in `cards`.
    pub fn stray_new_cards(&self) -> Vec<&str> {
        let drawn: HashSet<&str> = self.cards.iter().map(String::as_str).collect();
        self.new_cards
            .iter()
            .map(String::as_str)
            .filter(|id| !drawn.contains(id))
            .collect()
    }
}

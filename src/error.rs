use crate::models::Rarity;

#[derive(Debug, thiserror::Error)]
pub enum BoosterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Empty card pool for booster '{booster_id}' at rarity '{rarity}'")]
    EmptyPool { booster_id: String, rarity: Rarity },

    #[error("Invalid transition: cannot {action} while {phase}")]
    InvalidTransition { phase: String, action: String },

    #[error("Malformed booster result: {0}")]
    MalformedResult(String),

    #[error("Booster service error: {0}")]
    Service(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl BoosterError {
    /// Fatal misconfiguration (bad rarity table or missing catalog pool).
    /// These are surfaced to the operator and never retried.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BoosterError::Configuration(_) | BoosterError::EmptyPool { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BoosterError>;

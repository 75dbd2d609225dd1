//! Booster service clients.
//!
//! [`BoosterService`] is the seam between the reveal machine and whatever
//! performs the actual opening. [`HttpBoosterService`] calls the REST
//! endpoint; [`SimulatedBoosterService`] performs the draw locally with the
//! rarity resolver, for offline use and tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::blocking::Client;

use crate::booster::RarityResolver;
use crate::catalog::Catalog;
use crate::config::DrawRules;
use crate::error::{BoosterError, Result};
use crate::models::{BoosterOpenResult, OpenBoosterRequest};

/// Performs one booster opening for the current user.
pub trait BoosterService: Send + Sync {
    fn open(&self, request: &OpenBoosterRequest) -> Result<BoosterOpenResult>;
}

// ---------------------------------------------------------------------------
// HttpBoosterService
// ---------------------------------------------------------------------------

/// Opens boosters through `POST {api_base}/boosters/open`.
pub struct HttpBoosterService {
    client: Client,
    api_base: String,
    auth_token: Option<String>,
}

impl HttpBoosterService {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            auth_token: None,
        })
    }

    /// Send `token` as a bearer token with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn open_url(&self) -> String {
        format!("{}/boosters/open", self.api_base)
    }
}

impl BoosterService for HttpBoosterService {
    fn open(&self, request: &OpenBoosterRequest) -> Result<BoosterOpenResult> {
        let url = self.open_url();
        tracing::debug!(url = %url, booster_id = ?request.booster_id, "opening booster");

        let mut req = self.client.post(&url).json(request);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send()?;
        let success = resp.status().is_success();
        let body = resp.text()?;
        parse_open_response(success, &body)
    }
}

/// Interpret a booster-open response body.
///
/// Any `{"error": "..."}` body becomes [`BoosterError::Service`] with the
/// server's message; a success body that does not match the contract is a
/// [`BoosterError::MalformedResult`].
fn parse_open_response(success: bool, body: &str) -> Result<BoosterOpenResult> {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) if success => return Err(BoosterError::MalformedResult(e.to_string())),
        Err(_) => return Err(BoosterError::Service(body.trim().to_string())),
    };

    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Err(BoosterError::Service(message.to_string()));
    }
    if !success {
        return Err(BoosterError::Service(body.trim().to_string()));
    }

    serde_json::from_value(value).map_err(|e| BoosterError::MalformedResult(e.to_string()))
}

// ---------------------------------------------------------------------------
// SimulatedBoosterService
// ---------------------------------------------------------------------------

struct SimulationState {
    owned: HashSet<String>,
    available: i64,
    rng: StdRng,
}

/// In-process stand-in for the booster service.
///
/// Draws packs with [`RarityResolver`], reports cards the simulated user did
/// not own yet as new and spends one booster from a fixed allowance per open.
pub struct SimulatedBoosterService {
    catalog: Arc<Catalog>,
    rules: DrawRules,
    next_refill_time: Option<String>,
    state: Mutex<SimulationState>,
}

impl SimulatedBoosterService {
    pub fn new(catalog: Arc<Catalog>, rules: DrawRules, available: i64) -> Self {
        Self {
            catalog,
            rules,
            next_refill_time: None,
            state: Mutex::new(SimulationState {
                owned: HashSet::new(),
                available,
                rng: StdRng::from_entropy(),
            }),
        }
    }

    /// Make draws reproducible.
    pub fn seed(self, seed: u64) -> Self {
        self.with_state(|s| s.rng = StdRng::seed_from_u64(seed))
    }

    /// Cards the simulated user already owns.
    pub fn with_owned<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.with_state(move |s| s.owned.extend(ids))
    }

    pub fn with_next_refill_time(mut self, time: impl Into<String>) -> Self {
        self.next_refill_time = Some(time.into());
        self
    }

    /// Boosters left in the simulated allowance.
    pub fn available(&self) -> i64 {
        self.lock().available
    }

    pub fn owned(&self) -> HashSet<String> {
        self.lock().owned.clone()
    }

    fn with_state(mut self, f: impl FnOnce(&mut SimulationState)) -> Self {
        f(self.state.get_mut().unwrap_or_else(PoisonError::into_inner));
        self
    }

    // State is written only after a pack is drawn, so a poisoned lock still
    // holds a consistent state.
    fn lock(&self) -> MutexGuard<'_, SimulationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BoosterService for SimulatedBoosterService {
    fn open(&self, request: &OpenBoosterRequest) -> Result<BoosterOpenResult> {
        let booster_id = match &request.booster_id {
            Some(id) => id.clone(),
            None => self
                .catalog
                .boosters()
                .first()
                .map(|b| b.id.clone())
                .ok_or_else(|| BoosterError::NotFound("Catalog defines no boosters".to_string()))?,
        };

        let mut state = self.lock();
        if state.available <= 0 {
            return Err(BoosterError::Service("No boosters available".to_string()));
        }

        let resolver = RarityResolver::new(&self.catalog, &self.rules);
        let pack = resolver.open_pack_with(&booster_id, &mut state.rng)?;

        let mut new_cards = Vec::new();
        for id in &pack.card_ids {
            if state.owned.insert(id.clone()) {
                new_cards.push(id.clone());
            }
        }
        state.available -= 1;

        Ok(BoosterOpenResult {
            cards: pack.card_ids,
            new_cards,
            available_boosters_remaining: state.available,
            next_refill_time: if state.available == 0 {
                self.next_refill_time.clone()
            } else {
                None
            },
        })
    }
}

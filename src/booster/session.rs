//! Booster reveal state machine.
//!
//! A [`RevealMachine`] walks one booster opening through
//! `idle -> opening -> deck -> revealing -> complete`, exposing a single card
//! per [`reveal_next`](RevealMachine::reveal_next) call. Each successful open
//! builds a fresh [`RevealSession`]; sessions are never reset in place.
//!
//! The machine is single-threaded and synchronous. The only asynchronous
//! boundary is the booster-open request: callers obtain a [`RequestToken`]
//! from [`request_open`](RevealMachine::request_open), run the request however
//! they like and hand the outcome back with
//! [`receive_result`](RevealMachine::receive_result). Outcomes carrying a
//! token other than the pending one are discarded.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::config::DEFAULT_PACK_SIZE;
use crate::error::{BoosterError, Result};
use crate::models::{BoosterOpenResult, OpenBoosterRequest, Rarity};
use crate::service::BoosterService;

// ---------------------------------------------------------------------------
// Phases, tokens, events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealPhase {
    Idle,
    Opening,
    Deck,
    Revealing,
    Complete,
}

impl RevealPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RevealPhase::Idle => "idle",
            RevealPhase::Opening => "opening",
            RevealPhase::Deck => "deck",
            RevealPhase::Revealing => "revealing",
            RevealPhase::Complete => "complete",
        }
    }
}

impl fmt::Display for RevealPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one booster-open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// What [`RevealMachine::receive_result`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The outcome belonged to the pending request and built a session.
    Applied,
    /// The outcome was late or unsolicited and was dropped.
    Discarded,
}

/// One card exposed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealEvent {
    pub card_id: String,
    pub index: usize,
    pub is_new: bool,
    pub rarity: Rarity,
}

impl RevealEvent {
    /// Whether the view should play the special reveal for this card.
    pub fn is_special(&self) -> bool {
        self.rarity.is_special()
    }
}

/// Callbacks for the presentation layer. All methods default to no-ops.
pub trait RevealObserver {
    fn on_reveal(&mut self, _event: &RevealEvent) {}
    fn on_phase_change(&mut self, _phase: RevealPhase) {}
    fn on_complete(&mut self) {}
}

impl RevealObserver for () {}

// ---------------------------------------------------------------------------
// RevealSession
// ---------------------------------------------------------------------------

/// Reveal progress for one booster opening.
///
/// `revealed` is always the first `cursor` entries of `cards`.
#[derive(Debug, Clone)]
pub struct RevealSession {
    token: RequestToken,
    result: BoosterOpenResult,
    rarities: Vec<Rarity>,
    cursor: usize,
    revealed: Vec<String>,
    in_flight: bool,
}

impl RevealSession {
    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn result(&self) -> &BoosterOpenResult {
        &self.result
    }

    pub fn cards(&self) -> &[String] {
        &self.result.cards
    }

    pub fn rarities(&self) -> &[Rarity] {
        &self.rarities
    }

    pub fn card_count(&self) -> usize {
        self.result.cards.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn revealed(&self) -> &[String] {
        &self.revealed
    }

    pub fn remaining(&self) -> usize {
        self.card_count() - self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.card_count()
    }

    /// True while the last reveal waits for [`RevealMachine::settle`].
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Revealed ids the server reported as new.
    pub fn revealed_new_cards(&self) -> Vec<&str> {
        self.revealed
            .iter()
            .filter(|id| self.result.is_new(id))
            .map(String::as_str)
            .collect()
    }

    pub fn available_boosters_remaining(&self) -> i64 {
        self.result.available_boosters_remaining
    }
}

// ---------------------------------------------------------------------------
// RevealMachine
// ---------------------------------------------------------------------------

/// Drives booster openings and card reveals for one user.
///
/// By default each reveal settles immediately, so the final
/// [`reveal_next`](Self::reveal_next) runs straight through `revealing` into
/// `complete`. With [`manual_settle`](Self::manual_settle) the view calls
/// [`settle`](Self::settle) once a reveal's animation has finished; further
/// reveals are rejected until then.
pub struct RevealMachine<O: RevealObserver = ()> {
    catalog: Arc<Catalog>,
    observer: O,
    default_pack_size: usize,
    manual_settle: bool,
    phase: RevealPhase,
    session: Option<RevealSession>,
    pending: Option<(RequestToken, usize)>,
    next_token: u64,
    last_error: Option<String>,
}

impl RevealMachine<()> {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_observer(catalog, ())
    }
}

impl<O: RevealObserver> RevealMachine<O> {
    pub fn with_observer(catalog: Arc<Catalog>, observer: O) -> Self {
        Self {
            catalog,
            observer,
            default_pack_size: DEFAULT_PACK_SIZE,
            manual_settle: false,
            phase: RevealPhase::Idle,
            session: None,
            pending: None,
            next_token: 0,
            last_error: None,
        }
    }

    /// Pack size expected for requests that name no known booster.
    pub fn pack_size(mut self, size: usize) -> Self {
        self.default_pack_size = size;
        self
    }

    pub fn manual_settle(mut self, manual: bool) -> Self {
        self.manual_settle = manual;
        self
    }

    // -- Accessors ---------------------------------------------------------

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&RevealSession> {
        self.session.as_ref()
    }

    pub fn pending_token(&self) -> Option<RequestToken> {
        self.pending.map(|(token, _)| token)
    }

    /// Message of the error that last sent the machine back to `idle`.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    // -- Transitions -------------------------------------------------------

    /// `idle | complete -> opening`.
    ///
    /// Returns the token the eventual outcome must be delivered with. Only one
    /// open may be in flight; a session still being revealed must finish or be
    /// [`reset`](Self::reset) first.
    pub fn request_open(&mut self, request: &OpenBoosterRequest) -> Result<RequestToken> {
        match self.phase {
            RevealPhase::Idle | RevealPhase::Complete => {}
            RevealPhase::Opening => return Err(self.invalid("request an open (one already in flight)")),
            _ => return Err(self.invalid("request an open")),
        }

        let expected = request
            .booster_id
            .as_deref()
            .and_then(|id| self.catalog.booster(id))
            .map(|b| b.card_count)
            .unwrap_or(self.default_pack_size);

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        self.pending = Some((token, expected));
        self.session = None;
        self.last_error = None;
        tracing::debug!(token = token.0, booster_id = ?request.booster_id, "booster open requested");
        self.set_phase(RevealPhase::Opening);
        Ok(token)
    }

    /// `opening -> deck` on success, `opening -> idle` on failure.
    ///
    /// Service errors are returned unchanged. A result with the wrong number
    /// of cards, unknown card ids or `new_cards` outside `cards` fails with
    /// [`BoosterError::MalformedResult`]. Either way no session is built.
    pub fn receive_result(
        &mut self,
        token: RequestToken,
        outcome: Result<BoosterOpenResult>,
    ) -> Result<Delivery> {
        let expected = match self.pending {
            Some((pending, expected)) if pending == token && self.phase == RevealPhase::Opening => {
                expected
            }
            _ => {
                tracing::debug!(token = token.0, "discarding stale booster result");
                return Ok(Delivery::Discarded);
            }
        };
        self.pending = None;

        let built = outcome.and_then(|result| self.build_session(token, result, expected));
        match built {
            Ok(session) => {
                tracing::info!(token = token.0, cards = session.card_count(), "booster opened");
                let empty = session.card_count() == 0;
                self.session = Some(session);
                self.set_phase(RevealPhase::Deck);
                if empty {
                    self.enter_revealing();
                }
                Ok(Delivery::Applied)
            }
            Err(e) => {
                tracing::warn!(token = token.0, error = %e, "booster open failed");
                self.last_error = Some(e.to_string());
                self.set_phase(RevealPhase::Idle);
                Err(e)
            }
        }
    }

    /// Request, perform and receive an open against `service` in one call.
    pub fn open_with(
        &mut self,
        service: &dyn BoosterService,
        request: &OpenBoosterRequest,
    ) -> Result<&RevealSession> {
        let token = self.request_open(request)?;
        let outcome = service.open(request);
        self.receive_result(token, outcome)?;
        self.session
            .as_ref()
            .ok_or_else(|| BoosterError::NotFound("No reveal session after open".to_string()))
    }

    /// Reveal the card under the cursor.
    ///
    /// Valid only in `deck`, with cards left and no reveal in flight; any
    /// other call fails with [`BoosterError::InvalidTransition`] and changes
    /// nothing. The last card moves the machine to `revealing`.
    pub fn reveal_next(&mut self) -> Result<RevealEvent> {
        if self.phase != RevealPhase::Deck {
            return Err(self.invalid("reveal a card"));
        }
        let manual = self.manual_settle;
        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(invalid_transition(RevealPhase::Deck, "reveal a card")),
        };
        if session.in_flight {
            return Err(BoosterError::InvalidTransition {
                phase: format!("{} (reveal {} in flight)", RevealPhase::Deck, session.cursor),
                action: "reveal a card".to_string(),
            });
        }
        if session.is_exhausted() {
            return Err(invalid_transition(RevealPhase::Deck, "reveal a card"));
        }

        let index = session.cursor;
        let card_id = session.result.cards[index].clone();
        let event = RevealEvent {
            is_new: session.result.is_new(&card_id),
            rarity: session.rarities[index],
            card_id: card_id.clone(),
            index,
        };
        session.revealed.push(card_id);
        session.cursor += 1;
        session.in_flight = manual;
        let exhausted = session.is_exhausted();

        self.observer.on_reveal(&event);
        if exhausted {
            self.enter_revealing();
        }
        Ok(event)
    }

    /// Report that the current reveal's side effects have finished.
    ///
    /// Clears the in-flight flag; in `revealing` this completes the session.
    pub fn settle(&mut self) -> Result<()> {
        match self.phase {
            RevealPhase::Deck => {
                if let Some(session) = self.session.as_mut() {
                    session.in_flight = false;
                }
                Ok(())
            }
            RevealPhase::Revealing => {
                self.complete();
                Ok(())
            }
            _ => Err(self.invalid("settle a reveal")),
        }
    }

    /// Abandon any pending open or session and return to `idle`.
    ///
    /// A result for the abandoned request arriving later is discarded.
    pub fn reset(&mut self) {
        self.pending = None;
        self.session = None;
        if self.phase != RevealPhase::Idle {
            self.set_phase(RevealPhase::Idle);
        }
    }

    // -- Private helpers ---------------------------------------------------

    fn build_session(
        &self,
        token: RequestToken,
        result: BoosterOpenResult,
        expected: usize,
    ) -> Result<RevealSession> {
        if result.cards.len() != expected {
            return Err(BoosterError::MalformedResult(format!(
                "expected {} cards, got {}",
                expected,
                result.cards.len()
            )));
        }

        let mut rarities = Vec::with_capacity(result.cards.len());
        for id in &result.cards {
            let card = self.catalog.card(id).ok_or_else(|| {
                BoosterError::MalformedResult(format!("unknown card id '{}'", id))
            })?;
            rarities.push(card.rarity);
        }

        let stray = result.stray_new_cards();
        if !stray.is_empty() {
            return Err(BoosterError::MalformedResult(format!(
                "new_cards not drawn in this pack: {}",
                stray.join(", ")
            )));
        }

        Ok(RevealSession {
            token,
            rarities,
            cursor: 0,
            revealed: Vec::with_capacity(result.cards.len()),
            in_flight: false,
            result,
        })
    }

    fn enter_revealing(&mut self) {
        self.set_phase(RevealPhase::Revealing);
        if !self.manual_settle {
            self.complete();
        }
    }

    fn complete(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.in_flight = false;
        }
        self.set_phase(RevealPhase::Complete);
        tracing::debug!("reveal session complete");
        self.observer.on_complete();
    }

    fn set_phase(&mut self, phase: RevealPhase) {
        self.phase = phase;
        self.observer.on_phase_change(phase);
    }

    fn invalid(&self, action: &str) -> BoosterError {
        invalid_transition(self.phase, action)
    }
}

fn invalid_transition(phase: RevealPhase, action: &str) -> BoosterError {
    BoosterError::InvalidTransition {
        phase: phase.to_string(),
        action: action.to_string(),
    }
}

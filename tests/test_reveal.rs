//! Reveal state machine tests: transitions, ordering, completion and the
//! failure paths of the booster-open boundary.

mod common;

use std::sync::Arc;

use booster_sdk::{
    BoosterError, BoosterOpenResult, BoosterService, Catalog, Delivery, DrawRules,
    OpenBoosterRequest, Rarity, RevealEvent, RevealMachine, RevealObserver, RevealPhase,
    SimulatedBoosterService,
};

#[derive(Default)]
struct Recorder {
    reveals: Vec<RevealEvent>,
    phases: Vec<RevealPhase>,
    completions: usize,
}

impl RevealObserver for Recorder {
    fn on_reveal(&mut self, event: &RevealEvent) {
        self.reveals.push(event.clone());
    }

    fn on_phase_change(&mut self, phase: RevealPhase) {
        self.phases.push(phase);
    }

    fn on_complete(&mut self) {
        self.completions += 1;
    }
}

fn abc_catalog() -> Arc<Catalog> {
    let value = serde_json::json!({
        "boosters": [
            { "id": "t1", "code": "T-1", "name": "Test", "cardCount": 3 }
        ],
        "cards": [
            { "id": "A", "name": "A", "rarity": "common", "booster_id": "t1" },
            { "id": "B", "name": "B", "rarity": "rare", "booster_id": "t1" },
            { "id": "C", "name": "C", "rarity": "secret_rare", "booster_id": "t1" }
        ]
    });
    Arc::new(Catalog::from_json(value).unwrap())
}

fn abc_result() -> BoosterOpenResult {
    BoosterOpenResult {
        cards: vec!["A".into(), "B".into(), "C".into()],
        new_cards: vec!["B".into()],
        available_boosters_remaining: 2,
        next_refill_time: None,
    }
}

fn t1() -> OpenBoosterRequest {
    OpenBoosterRequest::for_booster("t1")
}

/// Machine already in `deck` with the A/B/C pack.
fn dealt_machine() -> RevealMachine<Recorder> {
    let mut machine = RevealMachine::with_observer(abc_catalog(), Recorder::default());
    let token = machine.request_open(&t1()).unwrap();
    assert_eq!(
        machine.receive_result(token, Ok(abc_result())).unwrap(),
        Delivery::Applied
    );
    machine
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[test]
fn three_reveals_walk_deck_deck_complete() {
    let mut machine = dealt_machine();
    assert_eq!(machine.phase(), RevealPhase::Deck);

    machine.reveal_next().unwrap();
    assert_eq!(machine.session().unwrap().revealed(), ["A"]);
    assert_eq!(machine.phase(), RevealPhase::Deck);

    machine.reveal_next().unwrap();
    assert_eq!(machine.session().unwrap().revealed(), ["A", "B"]);
    assert_eq!(machine.phase(), RevealPhase::Deck);

    machine.reveal_next().unwrap();
    assert_eq!(machine.session().unwrap().revealed(), ["A", "B", "C"]);
    assert_eq!(machine.phase(), RevealPhase::Complete);

    assert_eq!(
        machine.observer().phases,
        vec![
            RevealPhase::Opening,
            RevealPhase::Deck,
            RevealPhase::Revealing,
            RevealPhase::Complete
        ]
    );
    assert_eq!(machine.observer().completions, 1);
}

#[test]
fn reveal_events_carry_index_newness_and_rarity() {
    let mut machine = dealt_machine();
    for _ in 0..3 {
        machine.reveal_next().unwrap();
    }

    let reveals = &machine.observer().reveals;
    assert_eq!(reveals.len(), 3);
    assert_eq!(
        reveals[1],
        RevealEvent {
            card_id: "B".into(),
            index: 1,
            is_new: true,
            rarity: Rarity::Rare,
        }
    );
    assert!(!reveals[0].is_new);
    assert!(!reveals[0].is_special());
    assert_eq!(reveals[2].rarity, Rarity::SecretRare);
    assert!(reveals[2].is_special());
    assert_eq!(machine.session().unwrap().revealed_new_cards(), vec!["B"]);
}

#[test]
fn revealed_is_prefix_after_every_reveal() {
    let (sdk, _tmp) = common::setup_cached_sdk();
    let service = sdk.simulated_service(1).unwrap().seed(42);
    let mut machine = sdk.reveal_machine().unwrap();

    let cards = machine
        .open_with(&service, &OpenBoosterRequest::for_booster("op01"))
        .unwrap()
        .cards()
        .to_vec();
    assert_eq!(cards.len(), 5);

    for k in 0..=cards.len() {
        let session = machine.session().unwrap();
        assert_eq!(session.cursor(), k);
        assert_eq!(session.revealed(), &cards[..k]);
        if k < cards.len() {
            let event = machine.reveal_next().unwrap();
            assert_eq!(event.index, k);
            assert_eq!(event.card_id, cards[k]);
        }
    }
    assert_eq!(machine.phase(), RevealPhase::Complete);
}

// ---------------------------------------------------------------------------
// Rejected reveals
// ---------------------------------------------------------------------------

#[test]
fn reveal_while_idle_is_invalid_transition() {
    let mut machine = RevealMachine::new(abc_catalog());
    let err = machine.reveal_next().unwrap_err();
    assert!(matches!(err, BoosterError::InvalidTransition { .. }));
    assert_eq!(machine.phase(), RevealPhase::Idle);
    assert!(machine.session().is_none());
}

#[test]
fn reveal_while_opening_is_invalid_transition() {
    let mut machine = RevealMachine::new(abc_catalog());
    machine.request_open(&t1()).unwrap();
    assert!(matches!(
        machine.reveal_next(),
        Err(BoosterError::InvalidTransition { .. })
    ));
    assert_eq!(machine.phase(), RevealPhase::Opening);
}

#[test]
fn reveal_after_complete_changes_nothing() {
    let mut machine = dealt_machine();
    for _ in 0..3 {
        machine.reveal_next().unwrap();
    }

    for _ in 0..3 {
        let err = machine.reveal_next().unwrap_err();
        assert!(matches!(err, BoosterError::InvalidTransition { .. }));
    }
    let session = machine.session().unwrap();
    assert_eq!(session.cursor(), 3);
    assert_eq!(session.revealed(), ["A", "B", "C"]);
    assert_eq!(machine.observer().completions, 1);
    assert_eq!(machine.observer().reveals.len(), 3);
}

// ---------------------------------------------------------------------------
// Manual settle
// ---------------------------------------------------------------------------

#[test]
fn manual_settle_blocks_duplicate_reveals() {
    let mut machine = RevealMachine::with_observer(abc_catalog(), Recorder::default())
        .manual_settle(true);
    let token = machine.request_open(&t1()).unwrap();
    machine.receive_result(token, Ok(abc_result())).unwrap();

    machine.reveal_next().unwrap();
    assert!(machine.session().unwrap().is_in_flight());

    let err = machine.reveal_next().unwrap_err();
    assert!(matches!(err, BoosterError::InvalidTransition { .. }));
    assert_eq!(machine.session().unwrap().cursor(), 1);

    machine.settle().unwrap();
    machine.reveal_next().unwrap();
    machine.settle().unwrap();
    machine.reveal_next().unwrap();
    assert_eq!(machine.phase(), RevealPhase::Revealing);
    assert_eq!(machine.observer().completions, 0);
    assert!(machine.reveal_next().is_err());

    machine.settle().unwrap();
    assert_eq!(machine.phase(), RevealPhase::Complete);
    assert_eq!(machine.observer().completions, 1);

    assert!(machine.settle().is_err());
    assert_eq!(machine.observer().completions, 1);
}

#[test]
fn settle_while_idle_is_invalid_transition() {
    let mut machine = RevealMachine::new(abc_catalog());
    assert!(matches!(
        machine.settle(),
        Err(BoosterError::InvalidTransition { .. })
    ));
}

// ---------------------------------------------------------------------------
// Opening guards and failures
// ---------------------------------------------------------------------------

#[test]
fn second_open_while_in_flight_is_rejected() {
    let mut machine = RevealMachine::new(abc_catalog());
    let first = machine.request_open(&t1()).unwrap();

    let err = machine.request_open(&t1()).unwrap_err();
    assert!(matches!(err, BoosterError::InvalidTransition { .. }));
    assert_eq!(machine.pending_token(), Some(first));
}

#[test]
fn open_while_revealing_a_pack_is_rejected() {
    let mut machine = dealt_machine();
    machine.reveal_next().unwrap();

    assert!(machine.request_open(&t1()).is_err());
    assert_eq!(machine.session().unwrap().revealed(), ["A"]);
}

#[test]
fn service_error_returns_to_idle_verbatim() {
    let mut machine = RevealMachine::new(abc_catalog());
    let token = machine.request_open(&t1()).unwrap();

    let err = machine
        .receive_result(token, Err(BoosterError::Service("No boosters available".into())))
        .unwrap_err();
    match err {
        BoosterError::Service(msg) => assert_eq!(msg, "No boosters available"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(machine.phase(), RevealPhase::Idle);
    assert!(machine.session().is_none());
    assert_eq!(
        machine.last_error(),
        Some("Booster service error: No boosters available")
    );
}

#[test]
fn wrong_card_count_is_malformed() {
    let mut machine = RevealMachine::new(abc_catalog());
    let token = machine.request_open(&t1()).unwrap();

    let mut result = abc_result();
    result.cards.pop();
    let err = machine.receive_result(token, Ok(result)).unwrap_err();
    assert!(matches!(err, BoosterError::MalformedResult(_)));
    assert_eq!(machine.phase(), RevealPhase::Idle);
    assert!(machine.session().is_none());
}

#[test]
fn unknown_card_id_is_malformed() {
    let mut machine = RevealMachine::new(abc_catalog());
    let token = machine.request_open(&t1()).unwrap();

    let mut result = abc_result();
    result.cards[2] = "Z".into();
    let err = machine.receive_result(token, Ok(result)).unwrap_err();
    assert!(matches!(err, BoosterError::MalformedResult(_)));
    assert_eq!(machine.phase(), RevealPhase::Idle);
}

#[test]
fn new_card_outside_pack_is_malformed() {
    let mut machine = RevealMachine::new(abc_catalog());
    let token = machine.request_open(&t1()).unwrap();

    let mut result = abc_result();
    result.new_cards.push("Q".into());
    let err = machine.receive_result(token, Ok(result)).unwrap_err();
    assert!(matches!(err, BoosterError::MalformedResult(_)));
}

#[test]
fn machine_recovers_after_failure() {
    let mut machine = RevealMachine::new(abc_catalog());
    let token = machine.request_open(&t1()).unwrap();
    let _ = machine.receive_result(token, Err(BoosterError::Service("timeout".into())));

    let token = machine.request_open(&t1()).unwrap();
    machine.receive_result(token, Ok(abc_result())).unwrap();
    assert_eq!(machine.phase(), RevealPhase::Deck);
    assert!(machine.last_error().is_none());
}

// ---------------------------------------------------------------------------
// Request tokens
// ---------------------------------------------------------------------------

#[test]
fn late_result_after_reset_is_discarded() {
    let mut machine = RevealMachine::new(abc_catalog());
    let token = machine.request_open(&t1()).unwrap();
    machine.reset();

    let delivery = machine.receive_result(token, Ok(abc_result())).unwrap();
    assert_eq!(delivery, Delivery::Discarded);
    assert_eq!(machine.phase(), RevealPhase::Idle);
    assert!(machine.session().is_none());
}

#[test]
fn stale_token_does_not_hijack_newer_request() {
    let mut machine = RevealMachine::new(abc_catalog());
    let old = machine.request_open(&t1()).unwrap();
    machine.reset();
    let current = machine.request_open(&t1()).unwrap();
    assert!(current > old);

    let stale = machine
        .receive_result(old, Err(BoosterError::Service("late".into())))
        .unwrap();
    assert_eq!(stale, Delivery::Discarded);
    assert_eq!(machine.phase(), RevealPhase::Opening);

    machine.receive_result(current, Ok(abc_result())).unwrap();
    assert_eq!(machine.session().unwrap().token(), current);
}

#[test]
fn next_open_builds_a_fresh_session() {
    let mut machine = dealt_machine();
    for _ in 0..3 {
        machine.reveal_next().unwrap();
    }

    let token = machine.request_open(&t1()).unwrap();
    assert!(machine.session().is_none());

    let mut second = abc_result();
    second.cards = vec!["C".into(), "B".into(), "A".into()];
    machine.receive_result(token, Ok(second)).unwrap();

    let session = machine.session().unwrap();
    assert_eq!(session.cursor(), 0);
    assert!(session.revealed().is_empty());
    assert_eq!(session.cards(), ["C", "B", "A"]);

    machine.reveal_next().unwrap();
    assert_eq!(machine.session().unwrap().revealed(), ["C"]);
}

#[test]
fn completion_fires_once_per_session() {
    let mut machine = dealt_machine();
    for _ in 0..3 {
        machine.reveal_next().unwrap();
    }
    let token = machine.request_open(&t1()).unwrap();
    machine.receive_result(token, Ok(abc_result())).unwrap();
    for _ in 0..3 {
        machine.reveal_next().unwrap();
    }
    assert_eq!(machine.observer().completions, 2);
}

#[test]
fn empty_pack_completes_without_reveals() {
    let mut machine = RevealMachine::with_observer(abc_catalog(), Recorder::default()).pack_size(0);
    let token = machine.request_open(&OpenBoosterRequest::default()).unwrap();

    let empty = BoosterOpenResult {
        cards: vec![],
        new_cards: vec![],
        available_boosters_remaining: 0,
        next_refill_time: Some("2024-01-01T12:00:00Z".into()),
    };
    machine.receive_result(token, Ok(empty)).unwrap();
    assert_eq!(machine.phase(), RevealPhase::Complete);
    assert_eq!(machine.observer().completions, 1);
    assert!(machine.reveal_next().is_err());
}

// ---------------------------------------------------------------------------
// open_with
// ---------------------------------------------------------------------------

struct FailingService;

impl BoosterService for FailingService {
    fn open(&self, _request: &OpenBoosterRequest) -> booster_sdk::Result<BoosterOpenResult> {
        Err(BoosterError::Service("maintenance".into()))
    }
}

#[test]
fn open_with_surfaces_service_failure() {
    let mut machine = RevealMachine::new(abc_catalog());
    let err = machine.open_with(&FailingService, &t1()).unwrap_err();
    assert!(matches!(err, BoosterError::Service(_)));
    assert_eq!(machine.phase(), RevealPhase::Idle);
}

#[test]
fn open_with_simulated_service_runs_full_session() {
    let catalog = Arc::new(common::sample_catalog());
    let service = SimulatedBoosterService::new(catalog.clone(), DrawRules::default(), 2).seed(7);
    let mut machine = RevealMachine::with_observer(catalog, Recorder::default());

    let session = machine
        .open_with(&service, &OpenBoosterRequest::for_booster("op01"))
        .unwrap();
    assert_eq!(session.available_boosters_remaining(), 1);

    while machine.reveal_next().is_ok() {}
    assert_eq!(machine.phase(), RevealPhase::Complete);
    assert_eq!(machine.observer().reveals.len(), 5);
    assert!(machine
        .observer()
        .reveals
        .iter()
        .any(|e| e.rarity.is_rare_or_better()));
}

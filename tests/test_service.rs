//! Simulated booster service tests.

mod common;

use std::sync::Arc;

use booster_sdk::{
    BoosterError, BoosterService, DrawRules, OpenBoosterRequest, Rarity, SimulatedBoosterService,
};

fn service(available: i64) -> SimulatedBoosterService {
    SimulatedBoosterService::new(Arc::new(common::sample_catalog()), DrawRules::default(), available)
        .seed(99)
}

#[test]
fn open_returns_full_pack_and_spends_one_booster() {
    let service = service(3);
    let result = service.open(&OpenBoosterRequest::for_booster("op01")).unwrap();

    assert_eq!(result.cards.len(), 5);
    assert_eq!(result.available_boosters_remaining, 2);
    assert_eq!(service.available(), 2);
    assert!(result.stray_new_cards().is_empty());
}

#[test]
fn first_pack_reports_every_distinct_card_as_new() {
    let service = service(1);
    let result = service.open(&OpenBoosterRequest::for_booster("op01")).unwrap();

    let mut distinct = result.cards.clone();
    distinct.sort();
    distinct.dedup();
    let mut new_cards = result.new_cards.clone();
    new_cards.sort();
    assert_eq!(new_cards, distinct);
}

#[test]
fn owned_cards_are_never_new() {
    let catalog = common::sample_catalog();
    let all_ids: Vec<String> = catalog.cards().iter().map(|c| c.id.clone()).collect();
    let service = SimulatedBoosterService::new(Arc::new(catalog), DrawRules::default(), 5)
        .seed(1)
        .with_owned(all_ids);

    for _ in 0..5 {
        let result = service.open(&OpenBoosterRequest::for_booster("op01")).unwrap();
        assert!(result.new_cards.is_empty());
    }
}

#[test]
fn exhausted_allowance_is_service_error() {
    let service = service(1).with_next_refill_time("2024-01-01T12:00:00Z");
    let last = service.open(&OpenBoosterRequest::default()).unwrap();
    assert_eq!(last.available_boosters_remaining, 0);
    assert_eq!(last.next_refill_time.as_deref(), Some("2024-01-01T12:00:00Z"));

    let err = service.open(&OpenBoosterRequest::default()).unwrap_err();
    match err {
        BoosterError::Service(msg) => assert_eq!(msg, "No boosters available"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn default_request_opens_first_catalog_booster() {
    let service = service(1);
    let result = service.open(&OpenBoosterRequest::default()).unwrap();
    assert!(result.cards.iter().all(|id| id.starts_with("op01-")));
}

#[test]
fn every_simulated_pack_meets_rare_floor() {
    let catalog = Arc::new(common::sample_catalog());
    let service = SimulatedBoosterService::new(catalog.clone(), DrawRules::default(), 500).seed(3);

    for _ in 0..500 {
        let result = service.open(&OpenBoosterRequest::for_booster("op01")).unwrap();
        let best = result
            .cards
            .iter()
            .filter_map(|id| catalog.card(id))
            .map(|c| c.rarity)
            .max()
            .unwrap();
        assert!(best >= Rarity::Rare);
    }
}

#[test]
fn missing_pool_surfaces_empty_pool_and_keeps_allowance() {
    let service = service(2);
    let err = service.open(&OpenBoosterRequest::for_booster("op99")).unwrap_err();
    assert!(matches!(err, BoosterError::EmptyPool { .. }));
    assert_eq!(service.available(), 2);
}

#[test]
fn open_request_serializes_camel_case() {
    let body = serde_json::to_value(OpenBoosterRequest::for_booster("op01")).unwrap();
    assert_eq!(body, serde_json::json!({ "boosterId": "op01" }));
    let empty = serde_json::to_value(OpenBoosterRequest::default()).unwrap();
    assert_eq!(empty, serde_json::json!({}));
}

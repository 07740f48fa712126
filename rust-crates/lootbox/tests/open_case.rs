#![allow(non_snake_case)]
use lootbox::{
    Catalog,
    EmptyTierPolicy,
    Error,
    Money,
    OpeningConfig,
    RarityWeights,
    Session,
    fairness::{
        FairnessState,
        replay_opening,
    },
    ledger,
};
use rand::{
    SeedableRng,
    rngs::StdRng,
};

fn session(balance: &str) -> Session {
    Session::with_fairness(balance.parse().unwrap(), FairnessState::new("integration"))
}

#[test]
fn open_case__exact_balance_buys_and_credits_winner() {
    // given
    let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
    let case = catalog.get("3").unwrap();
    assert_eq!(case.price, Money::from_cents(499));
    let mut session = session("4.99");

    // when
    let mut opening = session
        .open_case(
            case,
            &OpeningConfig::default(),
            &RarityWeights::default(),
            EmptyTierPolicy::Renormalize,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
    let won = session.reveal(&mut opening).unwrap().clone();

    // then
    assert_eq!(session.balance(), Money::ZERO);
    let pool_item = case.item(&won.id).unwrap();
    let held = &session.inventory().items()[0];
    assert_eq!(held.value, pool_item.value);
    assert_eq!(held.rarity, pool_item.rarity);
}

#[test]
fn purchase__short_balance_is_refused_without_change() {
    // given
    let balance = Money::from_cents(500);

    // when
    let result = ledger::purchase(balance, Money::from_cents(1_000));

    // then
    assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
    assert_eq!(balance, Money::from_cents(500));
}

#[test]
fn open_case__blocked_close_until_revealed() {
    let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
    let mut session = session("100.00");

    let mut opening = session
        .open_case(
            catalog.get("1").unwrap(),
            &OpeningConfig::default(),
            &RarityWeights::default(),
            EmptyTierPolicy::Renormalize,
            &mut StdRng::seed_from_u64(2),
        )
        .unwrap();
    assert!(!opening.can_close());

    session.reveal(&mut opening).unwrap();
    assert!(opening.can_close());
}

#[test]
fn open_case__every_opening_replays_after_rotation() {
    // given
    let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
    let weights = RarityWeights::default();
    let mut session = session("500.00");
    let mut history = Vec::new();

    // when
    for (n, case) in catalog.iter().take(10).enumerate() {
        let mut opening = session
            .open_case(
                case,
                &OpeningConfig::default(),
                &weights,
                EmptyTierPolicy::Renormalize,
                &mut StdRng::seed_from_u64(n as u64),
            )
            .unwrap();
        let won = session.reveal(&mut opening).unwrap().id.clone();
        history.push((case.id.clone(), opening.proof.clone(), won));
    }
    let revealed = session.fairness_mut().rotate();

    // then
    for (case_id, proof, won) in history {
        let replayed = replay_opening(
            catalog.get(&case_id).unwrap(),
            &weights,
            EmptyTierPolicy::Renormalize,
            &revealed.seed_hex,
            &proof.client_seed,
            proof.nonce,
        )
        .unwrap();
        assert_eq!(replayed.id, won);
    }
}

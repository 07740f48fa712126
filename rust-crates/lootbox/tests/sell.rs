#![allow(non_snake_case)]
use lootbox::{
    Item,
    Money,
    Rarity,
    ledger::{
        self,
        Inventory,
    },
};
use proptest::prelude::*;

fn item(id: &str, value: &str) -> Item {
    Item {
        id: id.to_string(),
        name: id.to_string(),
        image: String::new(),
        rarity: Rarity::Epic,
        value: value.parse().unwrap(),
        category: "test".to_string(),
    }
}

#[test]
fn sell_many__two_items_refund_exact_sum() {
    // given
    let mut inventory = Inventory::new();
    ledger::credit(&mut inventory, item("keep", "3.33"));
    ledger::credit(&mut inventory, item("a", "12.00"));
    ledger::credit(&mut inventory, item("b", "8.50"));
    let balance = Money::from_cents(1_000);

    // when
    let refund = ledger::sell_many(&mut inventory, &["a", "b"]).unwrap();
    let balance = balance.checked_add(refund).unwrap();

    // then
    assert_eq!(inventory.len(), 1);
    assert_eq!(refund, Money::from_cents(2_050));
    assert_eq!(balance, Money::from_cents(3_050));
}

#[test]
fn credit_then_sell__round_trips() {
    // given
    let mut inventory = Inventory::new();
    ledger::credit(&mut inventory, item("x", "1.00"));
    let before = inventory.clone();
    let won = item("y", "7.77");

    // when
    ledger::credit(&mut inventory, won.clone());
    let refund = ledger::sell(&mut inventory, &won.id).unwrap();

    // then
    assert_eq!(inventory, before);
    assert_eq!(refund, won.value);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50, .. ProptestConfig::default()
    })]

    #[test]
    fn sell__balance_never_drifts(cents in proptest::collection::vec(1u64..10_000, 1..40)) {
        let mut inventory = Inventory::new();
        let mut expected = 0u64;
        for (i, c) in cents.iter().enumerate() {
            let mut it = item(&format!("i{i}"), "0");
            it.value = Money::from_cents(*c);
            expected += c;
            ledger::credit(&mut inventory, it);
        }

        let mut balance = Money::ZERO;
        for i in 0..cents.len() {
            let refund = ledger::sell(&mut inventory, &format!("i{i}")).unwrap();
            balance = balance.checked_add(refund).unwrap();
        }

        prop_assert_eq!(balance, Money::from_cents(expected));
    }
}

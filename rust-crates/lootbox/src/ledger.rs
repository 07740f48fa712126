//! Balance and inventory mutations.

use crate::{
    Error,
    Item,
    Money,
    Rarity,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    cmp::Reverse,
    collections::{
        BTreeMap,
        HashMap,
    },
};
use tracing::{
    info,
    warn,
};

/// Won items, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory(Vec<Item>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InventorySort {
    #[default]
    Recent,
    Value,
    Rarity,
}

impl InventorySort {
    pub fn next(self) -> Self {
        match self {
            InventorySort::Recent => InventorySort::Value,
            InventorySort::Value => InventorySort::Rarity,
            InventorySort::Rarity => InventorySort::Recent,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InventorySort::Recent => "recent",
            InventorySort::Value => "value",
            InventorySort::Rarity => "rarity",
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.0.iter().any(|item| item.id == item_id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn total_value(&self) -> Money {
        self.0.iter().map(|item| item.value).sum()
    }

    pub fn filter_rarity(&self, rarity: Rarity) -> impl Iterator<Item = &Item> {
        self.0.iter().filter(move |item| item.rarity == rarity)
    }

    /// Stable ordering for display; `Recent` puts the newest win first.
    pub fn sorted(&self, sort: InventorySort) -> Vec<&Item> {
        let mut out: Vec<&Item> = self.0.iter().rev().collect();
        match sort {
            InventorySort::Recent => {}
            InventorySort::Value => out.sort_by_key(|item| Reverse(item.value)),
            InventorySort::Rarity => out.sort_by_key(|item| Reverse(item.rarity)),
        }
        out
    }

    pub fn count_by_rarity(&self) -> BTreeMap<Rarity, usize> {
        let mut counts = BTreeMap::new();
        for item in &self.0 {
            *counts.entry(item.rarity).or_insert(0) += 1;
        }
        counts
    }

    fn position_of_newest(&self, item_id: &str) -> Option<usize> {
        self.0.iter().rposition(|item| item.id == item_id)
    }
}

/// New balance after paying `price`, or `InsufficientFunds` with nothing spent.
pub fn purchase(balance: Money, price: Money) -> Result<Money> {
    balance
        .checked_sub(price)
        .ok_or(Error::InsufficientFunds { balance, price })
}

pub fn credit(inventory: &mut Inventory, item: Item) {
    inventory.0.push(item);
}

/// Removes the most recently credited entry with `item_id` and returns its
/// value as the refund.
pub fn sell(inventory: &mut Inventory, item_id: &str) -> Result<Money> {
    let Some(position) = inventory.position_of_newest(item_id) else {
        warn!(item = %item_id, "sell of an item not in inventory");
        return Err(Error::ItemNotFound(item_id.to_string()));
    };
    let sold = inventory.0.remove(position);
    info!(item = %sold.id, value = %sold.value, "sold item");
    Ok(sold.value)
}

/// Sells every id in `item_ids` or nothing at all.
///
/// Repeated ids sell that many copies; every copy must be present before
/// anything is removed.
pub fn sell_many<S>(inventory: &mut Inventory, item_ids: &[S]) -> Result<Money>
where
    S: AsRef<str>,
{
    let mut wanted: HashMap<&str, usize> = HashMap::new();
    for id in item_ids {
        *wanted.entry(id.as_ref()).or_insert(0) += 1;
    }
    for (id, count) in &wanted {
        let held = inventory.0.iter().filter(|item| item.id == *id).count();
        if held < *count {
            warn!(item = %id, wanted = count, held, "batch sell refused");
            return Err(Error::ItemNotFound((*id).to_string()));
        }
    }

    let mut refund = Money::ZERO;
    for id in item_ids {
        let id = id.as_ref();
        let position = inventory
            .position_of_newest(id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        let sold = inventory.0.remove(position);
        refund = refund.checked_add(sold.value)?;
    }
    info!(count = item_ids.len(), refund = %refund, "sold batch");
    Ok(refund)
}

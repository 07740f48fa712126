//! Static case definitions.
//!
//! The storefront's catalog ships inside the crate as JSON and is validated
//! once at load time, so resolution never has to defend against malformed
//! cases.

use crate::{
    Error,
    Money,
    Rarity,
    RarityWeights,
    Result,
    resolver::EmptyTierPolicy,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::HashSet,
    path::Path,
};
use tracing::{
    debug,
    warn,
};

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub image: String,
    pub rarity: Rarity,
    pub value: Money,
    pub category: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    pub items: Vec<Item>,
}

impl Case {
    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn items_of(&self, rarity: Rarity) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(move |item| item.rarity == rarity)
    }

    /// Category tags compare without regard to ASCII case.
    pub fn in_category(&self, category: &str) -> bool {
        self.category.eq_ignore_ascii_case(category)
    }

    pub fn has_tier(&self, rarity: Rarity) -> bool {
        self.items.iter().any(|item| item.rarity == rarity)
    }

    /// Tiers with at least one item, in draw order.
    pub fn tiers_present(&self) -> Vec<Rarity> {
        Rarity::DRAW_ORDER
            .into_iter()
            .filter(|r| self.has_tier(*r))
            .collect()
    }

    /// Effective chance of winning each item, in pool order.
    pub fn odds(
        &self,
        weights: &RarityWeights,
        policy: EmptyTierPolicy,
    ) -> Vec<(&Item, f64)> {
        let mut odds: Vec<(&Item, f64)> = self
            .items
            .iter()
            .map(|item| {
                let tier_size = self.items_of(item.rarity).count() as f64;
                let tier_chance = match policy {
                    EmptyTierPolicy::Renormalize => weights
                        .restricted(|r| self.has_tier(r))
                        .probability(item.rarity),
                    EmptyTierPolicy::FirstInPool => weights.probability(item.rarity),
                };
                (item, tier_chance / tier_size)
            })
            .collect();

        if policy == EmptyTierPolicy::FirstInPool {
            let orphaned: f64 = Rarity::DRAW_ORDER
                .into_iter()
                .filter(|r| !self.has_tier(*r))
                .map(|r| weights.probability(r))
                .sum();
            if let Some((_, first)) = odds.first_mut() {
                *first += orphaned;
            }
        }
        odds
    }

    fn validate(&self, weights: &RarityWeights) -> Result<()> {
        if self.items.is_empty() {
            return Err(Error::Definition(format!(
                "case {} ({}) has no items",
                self.id, self.name
            )));
        }
        if self.price.is_zero() {
            return Err(Error::Definition(format!(
                "case {} ({}) has a zero price",
                self.id, self.name
            )));
        }
        let mut seen = HashSet::new();
        for item in &self.items {
            if !seen.insert(item.id.as_str()) {
                return Err(Error::Definition(format!(
                    "case {} lists item {} twice",
                    self.id, item.id
                )));
            }
        }
        let missing: Vec<Rarity> = Rarity::DRAW_ORDER
            .into_iter()
            .filter(|r| weights.weight(*r) > 0 && !self.has_tier(*r))
            .collect();
        if !missing.is_empty() {
            warn!(case = %self.id, ?missing, "case has no items for weighted tiers");
        }
        if weights.restricted(|r| self.has_tier(r)).total() == 0 {
            return Err(Error::Definition(format!(
                "case {} only holds tiers with zero weight",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    cases: Vec<Case>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    cases: Vec<Case>,
}

impl Catalog {
    /// The storefront's built-in catalog.
    pub fn embedded(weights: &RarityWeights) -> Result<Self> {
        Self::from_json(EMBEDDED_CATALOG, weights)
    }

    pub fn from_json(json: &str, weights: &RarityWeights) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.cases, weights)
    }

    pub fn from_path(path: impl AsRef<Path>, weights: &RarityWeights) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json, weights)
    }

    pub fn new(cases: Vec<Case>, weights: &RarityWeights) -> Result<Self> {
        let catalog = Catalog { cases };
        catalog.validate(weights)?;
        debug!(cases = catalog.cases.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn validate(&self, weights: &RarityWeights) -> Result<()> {
        weights.validate()?;
        let mut ids = HashSet::new();
        for case in &self.cases {
            if !ids.insert(case.id.as_str()) {
                return Err(Error::Definition(format!("case id {} is used twice", case.id)));
            }
            case.validate(weights)?;
        }
        Ok(())
    }

    pub fn get(&self, case_id: &str) -> Result<&Case> {
        self.cases
            .iter()
            .find(|case| case.id == case_id)
            .ok_or_else(|| Error::CaseNotFound(case_id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.cases.iter()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Case> {
        self.cases
            .iter()
            .filter(move |case| case.in_category(category))
    }

    pub fn featured(&self) -> impl Iterator<Item = &Case> {
        self.cases.iter().filter(|case| case.featured)
    }

    /// Distinct category tags in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for case in &self.cases {
            if !out.contains(&case.category.as_str()) {
                out.push(&case.category);
            }
        }
        out
    }

    /// Case-insensitive match against case names and the names of their items.
    pub fn search(&self, query: &str) -> Vec<&Case> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.cases.iter().collect();
        }
        self.cases
            .iter()
            .filter(|case| {
                case.name.to_lowercase().contains(&needle)
                    || case
                        .items
                        .iter()
                        .any(|item| item.name.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(non_snake_case)]
    use super::*;

    pub(crate) fn item(id: &str, rarity: Rarity, value: &str) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Item {id}"),
            image: String::new(),
            rarity,
            value: value.parse().unwrap(),
            category: "test".to_string(),
        }
    }

    pub(crate) fn case_with(items: Vec<Item>) -> Case {
        Case {
            id: "t".to_string(),
            name: "Test Case".to_string(),
            price: Money::from_cents(499),
            image: String::new(),
            category: "gaming".to_string(),
            featured: false,
            accent: None,
            items,
        }
    }

    #[test]
    fn embedded__loads_every_storefront_case() {
        // when
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();

        // then
        assert_eq!(catalog.len(), 42);
        let starter = catalog.get("1").unwrap();
        assert_eq!(starter.name, "Starter Pack");
        assert_eq!(starter.price, Money::from_cents(99));
        assert_eq!(starter.items[0].value, Money::from_cents(2850));
    }

    #[test]
    fn get__unknown_id_is_case_not_found() {
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
        assert!(matches!(catalog.get("404"), Err(Error::CaseNotFound(id)) if id == "404"));
    }

    #[test]
    fn categories__are_distinct_in_first_seen_order() {
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
        assert_eq!(catalog.categories(), vec!["gaming", "tech", "fashion"]);
    }

    #[test]
    fn featured__only_returns_flagged_cases() {
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
        let ids: Vec<&str> = catalog.featured().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "4", "9"]);
    }

    #[test]
    fn by_category__filters_on_tag() {
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
        assert!(catalog.by_category("fashion").all(|c| c.category == "fashion"));
        assert!(catalog.by_category("FASHION").count() > 0);
    }

    #[test]
    fn in_category__ignores_ascii_case() {
        let case = case_with(vec![item("a", Rarity::Common, "1.00")]);
        assert!(case.in_category("Gaming"));
        assert!(case.in_category("GAMING"));
        assert!(!case.in_category("tech"));
    }

    #[test]
    fn search__matches_item_names_case_insensitively() {
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
        let hits = catalog.search("gaming headset");
        assert!(hits.iter().any(|c| c.id == "1"));
    }

    #[test]
    fn validate__rejects_empty_pool() {
        // given
        let json = r#"{"cases":[{"id":"x","name":"Empty","price":"1.00","image":"","category":"tech","items":[]}]}"#;

        // when
        let result = Catalog::from_json(json, &RarityWeights::default());

        // then
        assert!(matches!(result, Err(Error::Definition(_))));
    }

    #[test]
    fn validate__rejects_duplicate_item_ids() {
        let case = case_with(vec![
            item("a", Rarity::Common, "1.00"),
            item("a", Rarity::Rare, "2.00"),
        ]);
        let result = Catalog::new(vec![case], &RarityWeights::default());
        assert!(matches!(result, Err(Error::Definition(_))));
    }

    #[test]
    fn validate__rejects_zero_price() {
        let mut case = case_with(vec![item("a", Rarity::Common, "1.00")]);
        case.price = Money::ZERO;
        let result = Catalog::new(vec![case], &RarityWeights::default());
        assert!(matches!(result, Err(Error::Definition(_))));
    }

    #[test]
    fn from_json__rejects_inexact_prices() {
        let json = r#"{"cases":[{"id":"x","name":"Bad","price":"1.999","image":"","category":"tech","items":[]}]}"#;
        let result = Catalog::from_json(json, &RarityWeights::default());
        assert!(matches!(result, Err(Error::Catalog(_))));
    }

    #[test]
    fn odds__sum_to_one_under_both_policies() {
        let catalog = Catalog::embedded(&RarityWeights::default()).unwrap();
        let weights = RarityWeights::default();
        for case in catalog.iter() {
            for policy in [EmptyTierPolicy::Renormalize, EmptyTierPolicy::FirstInPool] {
                let total: f64 = case.odds(&weights, policy).iter().map(|(_, p)| p).sum();
                assert!((total - 1.0).abs() < 1e-9, "case {} sums to {total}", case.id);
            }
        }
    }

    #[test]
    fn tiers_present__lists_tiers_in_draw_order() {
        let case = case_with(vec![
            item("a", Rarity::Common, "1.00"),
            item("b", Rarity::Mythic, "90.00"),
        ]);
        assert_eq!(case.tiers_present(), vec![Rarity::Mythic, Rarity::Common]);
    }
}

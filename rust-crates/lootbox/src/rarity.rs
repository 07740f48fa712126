//! Rarity tiers and the process-wide weight table.

use crate::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    str::FromStr,
};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl Rarity {
    /// Declared draw order. Weight bands are laid out over `[0, total)` in
    /// this order, rarest first.
    pub const DRAW_ORDER: [Rarity; 5] = [
        Rarity::Mythic,
        Rarity::Legendary,
        Rarity::Epic,
        Rarity::Rare,
        Rarity::Common,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
            Rarity::Mythic => "Mythic",
        }
    }

    /// 1 for common up to 5 for mythic.
    pub fn rank(self) -> u8 {
        match self {
            Rarity::Common => 1,
            Rarity::Rare => 2,
            Rarity::Epic => 3,
            Rarity::Legendary => 4,
            Rarity::Mythic => 5,
        }
    }

    /// Wins worth celebrating on reveal.
    pub fn is_jackpot(self) -> bool {
        matches!(self, Rarity::Legendary | Rarity::Mythic)
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Rarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "common" => Ok(Rarity::Common),
            "rare" => Ok(Rarity::Rare),
            "epic" => Ok(Rarity::Epic),
            "legendary" => Ok(Rarity::Legendary),
            "mythic" => Ok(Rarity::Mythic),
            other => Err(Error::Definition(format!("unknown rarity {other:?}"))),
        }
    }
}

/// Relative drop weight per tier, shared by every case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarityWeights {
    pub mythic: u32,
    pub legendary: u32,
    pub epic: u32,
    pub rare: u32,
    pub common: u32,
}

impl Default for RarityWeights {
    fn default() -> Self {
        RarityWeights {
            mythic: 1,
            legendary: 5,
            epic: 15,
            rare: 30,
            common: 49,
        }
    }
}

impl RarityWeights {
    pub fn weight(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Mythic => self.mythic,
            Rarity::Legendary => self.legendary,
            Rarity::Epic => self.epic,
            Rarity::Rare => self.rare,
            Rarity::Common => self.common,
        }
    }

    fn weight_mut(&mut self, rarity: Rarity) -> &mut u32 {
        match rarity {
            Rarity::Mythic => &mut self.mythic,
            Rarity::Legendary => &mut self.legendary,
            Rarity::Epic => &mut self.epic,
            Rarity::Rare => &mut self.rare,
            Rarity::Common => &mut self.common,
        }
    }

    pub fn total(&self) -> u64 {
        Rarity::DRAW_ORDER
            .iter()
            .map(|r| u64::from(self.weight(*r)))
            .sum()
    }

    /// Same table with every tier rejected by `keep` zeroed out.
    pub fn restricted(&self, keep: impl Fn(Rarity) -> bool) -> RarityWeights {
        let mut out = *self;
        for rarity in Rarity::DRAW_ORDER {
            if !keep(rarity) {
                *out.weight_mut(rarity) = 0;
            }
        }
        out
    }

    /// Probability of `rarity` under this table, `0.0` for an empty table.
    pub fn probability(&self, rarity: Rarity) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.weight(rarity)) / total as f64
    }

    /// Maps a draw in `[0, total)` onto the tier whose band contains it.
    ///
    /// Returns `None` when the draw lies outside the table, which only
    /// happens for an all-zero table or a draw `>= total`.
    pub fn tier_for(&self, draw: f64) -> Option<Rarity> {
        let mut upper = 0.0;
        for rarity in Rarity::DRAW_ORDER {
            let weight = self.weight(rarity);
            if weight == 0 {
                continue;
            }
            upper += f64::from(weight);
            if draw < upper {
                return Some(rarity);
            }
        }
        None
    }

    pub fn validate(&self) -> Result<()> {
        if self.total() == 0 {
            return Err(Error::Definition(
                "rarity weight table must have a non-zero weight".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn default__totals_one_hundred() {
        assert_eq!(RarityWeights::default().total(), 100);
    }

    #[test]
    fn tier_for__partitions_bands_in_draw_order() {
        let weights = RarityWeights::default();
        assert_eq!(weights.tier_for(0.0), Some(Rarity::Mythic));
        assert_eq!(weights.tier_for(0.999), Some(Rarity::Mythic));
        assert_eq!(weights.tier_for(1.0), Some(Rarity::Legendary));
        assert_eq!(weights.tier_for(5.999), Some(Rarity::Legendary));
        assert_eq!(weights.tier_for(6.0), Some(Rarity::Epic));
        assert_eq!(weights.tier_for(21.0), Some(Rarity::Rare));
        assert_eq!(weights.tier_for(51.0), Some(Rarity::Common));
        assert_eq!(weights.tier_for(99.999), Some(Rarity::Common));
        assert_eq!(weights.tier_for(100.0), None);
    }

    #[test]
    fn restricted__skips_zeroed_tiers_when_banding() {
        // given
        let weights = RarityWeights::default()
            .restricted(|r| matches!(r, Rarity::Epic | Rarity::Common));

        // when
        let total = weights.total();

        // then
        assert_eq!(total, 64);
        assert_eq!(weights.tier_for(0.0), Some(Rarity::Epic));
        assert_eq!(weights.tier_for(14.9), Some(Rarity::Epic));
        assert_eq!(weights.tier_for(15.0), Some(Rarity::Common));
    }

    #[test]
    fn validate__rejects_all_zero_table() {
        let empty = RarityWeights::default().restricted(|_| false);
        assert!(matches!(empty.validate(), Err(Error::Definition(_))));
    }

    #[test]
    fn from_str__accepts_any_case() {
        assert_eq!("MYTHIC".parse::<Rarity>().unwrap(), Rarity::Mythic);
        assert!("uncommon".parse::<Rarity>().is_err());
    }

    #[test]
    fn ord__follows_rank() {
        assert!(Rarity::Mythic > Rarity::Legendary);
        assert!(Rarity::Rare > Rarity::Common);
        assert_eq!(Rarity::Epic.rank(), 3);
    }

    #[test]
    fn is_jackpot__covers_the_two_rarest_tiers() {
        let jackpots: Vec<Rarity> = Rarity::DRAW_ORDER
            .into_iter()
            .filter(|r| r.is_jackpot())
            .collect();
        assert_eq!(jackpots, vec![Rarity::Mythic, Rarity::Legendary]);
    }
}

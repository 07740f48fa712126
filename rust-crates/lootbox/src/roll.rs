//! Cosmetic reel sequences that land on an already-resolved winner.

use crate::{
    Case,
    Error,
    Item,
    Result,
};
use rand::{
    Rng,
    seq::IndexedRandom,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RollSequence {
    items: Vec<Item>,
    winner_index: usize,
}

impl RollSequence {
    /// Fills `length` slots uniformly from the case pool and splices `winner`
    /// in at `winner_index`.
    pub fn build<R>(
        case: &Case,
        winner: &Item,
        length: usize,
        winner_index: usize,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if length == 0 {
            return Err(Error::Definition("roll length must be positive".to_string()));
        }
        if winner_index >= length {
            return Err(Error::Definition(format!(
                "winner index {winner_index} is outside a roll of {length}"
            )));
        }
        let mut items = Vec::with_capacity(length);
        for _ in 0..length {
            let filler = case.items.choose(rng).ok_or_else(|| {
                Error::Definition(format!("case {} has no items", case.id))
            })?;
            items.push(filler.clone());
        }
        items[winner_index] = winner.clone();
        Ok(RollSequence {
            items,
            winner_index,
        })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn winner_index(&self) -> usize {
        self.winner_index
    }

    pub fn winner(&self) -> &Item {
        &self.items[self.winner_index]
    }

    /// Slots visible around `center`, clamped to the sequence.
    pub fn window(&self, center: usize, radius: usize) -> &[Item] {
        let center = center.min(self.items.len() - 1);
        let start = center.saturating_sub(radius);
        let end = (center + radius + 1).min(self.items.len());
        &self.items[start..end]
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        Rarity,
        catalog::tests::{
            case_with,
            item,
        },
    };
    use rand::{
        SeedableRng,
        rngs::StdRng,
    };

    fn pool() -> Case {
        case_with(vec![
            item("a", Rarity::Common, "1.00"),
            item("b", Rarity::Rare, "2.00"),
            item("c", Rarity::Legendary, "30.00"),
        ])
    }

    #[test]
    fn build__places_winner_at_index() {
        // given
        let case = pool();
        let winner = case.items[2].clone();
        let mut rng = StdRng::seed_from_u64(1);

        // when
        let roll = RollSequence::build(&case, &winner, 100, 95, &mut rng).unwrap();

        // then
        assert_eq!(roll.len(), 100);
        assert_eq!(roll.winner_index(), 95);
        assert_eq!(roll.winner().id, "c");
        assert_eq!(roll.items()[95], winner);
    }

    #[test]
    fn build__fills_from_case_pool_only() {
        let case = pool();
        let mut rng = StdRng::seed_from_u64(2);
        let roll = RollSequence::build(&case, &case.items[0], 50, 45, &mut rng).unwrap();
        assert!(roll.items().iter().all(|slot| case.item(&slot.id).is_some()));
    }

    #[test]
    fn build__rejects_bad_geometry() {
        let case = pool();
        let winner = case.items[0].clone();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            RollSequence::build(&case, &winner, 0, 0, &mut rng),
            Err(Error::Definition(_))
        ));
        assert!(matches!(
            RollSequence::build(&case, &winner, 10, 10, &mut rng),
            Err(Error::Definition(_))
        ));
    }

    #[test]
    fn window__clamps_at_edges() {
        let case = pool();
        let mut rng = StdRng::seed_from_u64(4);
        let roll = RollSequence::build(&case, &case.items[0], 10, 5, &mut rng).unwrap();

        assert_eq!(roll.window(0, 2).len(), 3);
        assert_eq!(roll.window(5, 2).len(), 5);
        assert_eq!(roll.window(9, 2).len(), 3);
        assert_eq!(roll.window(50, 2).len(), 3);
    }
}

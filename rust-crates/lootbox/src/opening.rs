//! One case opening, from debit to reveal.

use crate::{
    Error,
    Item,
    Money,
    Result,
    config::OpeningConfig,
    fairness::FairnessProof,
    roll::RollSequence,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpeningPhase {
    Spinning,
    Revealed,
}

/// Result is fixed when the opening is created; the phase only gates when
/// it is shown and credited.
#[derive(Clone, Debug)]
pub struct Opening {
    pub case_id: String,
    pub case_name: String,
    pub price: Money,
    pub proof: FairnessProof,
    pub config: OpeningConfig,
    winner: Item,
    roll: RollSequence,
    phase: OpeningPhase,
}

impl Opening {
    pub(crate) fn new(
        case_id: String,
        case_name: String,
        price: Money,
        winner: Item,
        roll: RollSequence,
        proof: FairnessProof,
        config: OpeningConfig,
    ) -> Self {
        Opening {
            case_id,
            case_name,
            price,
            proof,
            config,
            winner,
            roll,
            phase: OpeningPhase::Spinning,
        }
    }

    pub fn phase(&self) -> OpeningPhase {
        self.phase
    }

    pub fn is_spinning(&self) -> bool {
        self.phase == OpeningPhase::Spinning
    }

    /// Closing is refused until the reel has stopped.
    pub fn can_close(&self) -> bool {
        !self.is_spinning()
    }

    pub fn roll(&self) -> &RollSequence {
        &self.roll
    }

    /// Only visible once revealed, so the UI cannot leak the result early.
    pub fn revealed_item(&self) -> Option<&Item> {
        match self.phase {
            OpeningPhase::Revealed => Some(&self.winner),
            OpeningPhase::Spinning => None,
        }
    }

    /// Reel slot under the marker at `progress` in `[0, 1]` of the delay.
    pub fn reel_position(&self, progress: f64) -> usize {
        let target = self.roll.winner_index() as f64;
        (ease_out(progress) * target).round() as usize
    }

    pub(crate) fn finish(&mut self) -> Result<Item> {
        if !self.is_spinning() {
            return Err(Error::NotSpinning);
        }
        self.phase = OpeningPhase::Revealed;
        Ok(self.winner.clone())
    }
}

/// Cubic ease-out over `[0, 1]`.
pub fn ease_out(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(3)
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

    fn spinning() -> Opening {
        let case = case_with(vec![
            item("a", Rarity::Common, "1.00"),
            item("b", Rarity::Epic, "9.00"),
        ]);
        let winner = case.items[1].clone();
        let config = OpeningConfig::default();
        let roll = RollSequence::build(
            &case,
            &winner,
            config.roll_length,
            config.winner_index,
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();
        let proof = FairnessProof {
            commitment: "c".to_string(),
            client_seed: "s".to_string(),
            nonce: 1,
        };
        Opening::new(
            case.id.clone(),
            case.name.clone(),
            case.price,
            winner,
            roll,
            proof,
            config,
        )
    }

    #[test]
    fn finish__reveals_once() {
        // given
        let mut opening = spinning();
        assert!(!opening.can_close());
        assert!(opening.revealed_item().is_none());

        // when
        let won = opening.finish().unwrap();

        // then
        assert_eq!(won.id, "b");
        assert!(opening.can_close());
        assert_eq!(opening.revealed_item().map(|i| i.id.as_str()), Some("b"));
        assert!(matches!(opening.finish(), Err(Error::NotSpinning)));
    }

    #[test]
    fn reel_position__lands_on_winner() {
        let opening = spinning();
        assert_eq!(opening.reel_position(0.0), 0);
        assert_eq!(opening.reel_position(1.0), 95);
        assert_eq!(opening.roll().items()[opening.reel_position(1.0)].id, "b");
    }

    #[test]
    fn ease_out__is_monotonic_and_clamped() {
        assert_eq!(ease_out(-1.0), 0.0);
        assert_eq!(ease_out(2.0), 1.0);
        let samples: Vec<f64> = (0..=10).map(|i| ease_out(f64::from(i) / 10.0)).collect();
        assert!(samples.windows(2).all(|w| w[0] <= w[1]));
        assert!(ease_out(0.5) > 0.5);
    }
}

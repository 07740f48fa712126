use crate::{
    Error,
    Money,
    RarityWeights,
    Result,
    resolver::EmptyTierPolicy,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

/// Reel geometry and pacing for a case opening.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningConfig {
    pub roll_length: usize,
    pub winner_index: usize,
    pub reveal_delay_ms: u64,
}

impl Default for OpeningConfig {
    fn default() -> Self {
        OpeningConfig {
            roll_length: 100,
            winner_index: 95,
            reveal_delay_ms: 6_000,
        }
    }
}

impl OpeningConfig {
    /// Shorter reel used by the quick-open dialog.
    pub fn quick() -> Self {
        OpeningConfig {
            roll_length: 50,
            winner_index: 45,
            reveal_delay_ms: 5_000,
        }
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.roll_length == 0 {
            return Err(Error::Definition("roll length must be positive".to_string()));
        }
        if self.winner_index >= self.roll_length {
            return Err(Error::Definition(format!(
                "winner index {} is outside a roll of {}",
                self.winner_index, self.roll_length
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub weights: RarityWeights,
    pub empty_tier_policy: EmptyTierPolicy,
    pub opening: OpeningConfig,
    pub starting_balance: Money,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.opening.validate()
    }
}

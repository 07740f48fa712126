//! Weighted-rarity reward resolution.

use crate::{
    Case,
    Error,
    Item,
    Rarity,
    RarityWeights,
    Result,
};
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::debug;

/// What to do when the drawn tier has no items in the case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyTierPolicy {
    /// Drop absent tiers from the table before drawing.
    #[default]
    Renormalize,
    /// Draw over the full table and hand out the first pool item when the
    /// drawn tier is empty.
    FirstInPool,
}

/// Picks the tier a draw lands in, honoring `policy` for tiers the case lacks.
pub fn select_tier<R>(
    case: &Case,
    weights: &RarityWeights,
    policy: EmptyTierPolicy,
    rng: &mut R,
) -> Result<Rarity>
where
    R: Rng + ?Sized,
{
    let table = match policy {
        EmptyTierPolicy::Renormalize => weights.restricted(|r| case.has_tier(r)),
        EmptyTierPolicy::FirstInPool => *weights,
    };
    let total = table.total();
    if total == 0 {
        return Err(Error::Definition(format!(
            "case {} has no weighted tier to draw from",
            case.id
        )));
    }
    let draw = rng.random_range(0.0..total as f64);
    table.tier_for(draw).ok_or_else(|| {
        Error::Definition(format!("draw {draw} fell outside weight total {total}"))
    })
}

/// Resolves the single item a case opening awards.
///
/// Draws a tier by weight, then one item uniformly from that tier. The
/// outcome depends only on the inputs and the random stream.
pub fn resolve<'c, R>(
    case: &'c Case,
    weights: &RarityWeights,
    policy: EmptyTierPolicy,
    rng: &mut R,
) -> Result<&'c Item>
where
    R: Rng + ?Sized,
{
    if case.items.is_empty() {
        return Err(Error::Definition(format!("case {} has no items", case.id)));
    }
    let tier = select_tier(case, weights, policy, rng)?;
    let eligible: Vec<&Item> = case.items_of(tier).collect();

    let winner = if eligible.is_empty() {
        // only reachable under FirstInPool
        &case.items[0]
    } else {
        eligible[rng.random_range(0..eligible.len())]
    };
    debug!(case = %case.id, %tier, item = %winner.id, "resolved opening");
    Ok(winner)
}

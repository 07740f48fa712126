//! The single mutable store behind one player's visit.

use crate::{
    Case,
    Catalog,
    Error,
    Item,
    Money,
    RarityWeights,
    Result,
    battle::{
        self,
        BattleLobby,
        BattleOutcome,
    },
    config::{
        OpeningConfig,
        StoreConfig,
    },
    fairness::FairnessState,
    ledger::{
        self,
        Inventory,
    },
    opening::Opening,
    resolver::{
        self,
        EmptyTierPolicy,
    },
    roll::RollSequence,
};
use chrono::{
    DateTime,
    Utc,
};
use rand::Rng;
use std::collections::VecDeque;
use tracing::info;

pub const ACTIVITY_LIMIT: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub cases_opened: u32,
    pub battles_played: u32,
    pub battles_won: u32,
    pub total_spent: Money,
    pub total_won: Money,
    pub total_sold: Money,
    pub deposited: Money,
}

impl SessionStats {
    /// Share of battles won, in percent.
    pub fn win_rate(&self) -> f64 {
        if self.battles_played == 0 {
            return 0.0;
        }
        f64::from(self.battles_won) * 100.0 / f64::from(self.battles_played)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Deposit,
    Opened,
    Won,
    Sold,
    BattleWon,
    BattleLost,
}

impl ActivityKind {
    pub fn verb(self) -> &'static str {
        match self {
            ActivityKind::Deposit => "Deposited",
            ActivityKind::Opened => "Opened",
            ActivityKind::Won => "Won",
            ActivityKind::Sold => "Sold",
            ActivityKind::BattleWon => "Won Battle",
            ActivityKind::BattleLost => "Lost Battle",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Activity {
    pub at: DateTime<Utc>,
    pub kind: ActivityKind,
    pub label: String,
    pub value: Money,
}

#[derive(Debug)]
pub struct Session {
    profile: Option<Profile>,
    balance: Money,
    inventory: Inventory,
    stats: SessionStats,
    activity: VecDeque<Activity>,
    fairness: FairnessState,
}

impl Session {
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_fairness(config.starting_balance, FairnessState::default())
    }

    pub fn with_fairness(balance: Money, fairness: FairnessState) -> Self {
        Session {
            profile: None,
            balance,
            inventory: Inventory::new(),
            stats: SessionStats::default(),
            activity: VecDeque::new(),
            fairness,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Newest first.
    pub fn activity(&self) -> impl Iterator<Item = &Activity> {
        self.activity.iter()
    }

    pub fn fairness(&self) -> &FairnessState {
        &self.fairness
    }

    pub fn fairness_mut(&mut self) -> &mut FairnessState {
        &mut self.fairness
    }

    fn record(&mut self, kind: ActivityKind, label: impl Into<String>, value: Money) {
        self.activity.push_front(Activity {
            at: Utc::now(),
            kind,
            label: label.into(),
            value,
        });
        self.activity.truncate(ACTIVITY_LIMIT);
    }

    /// Signs in with an email or plain name; the part before `@` becomes the
    /// display name and the balance starts from zero.
    pub fn sign_in(&mut self, identity: &str) -> Result<&Profile> {
        let name = identity
            .split_once('@')
            .map_or(identity, |(local, _)| local)
            .trim();
        if name.is_empty() {
            return Err(Error::InvalidIdentity(identity.to_string()));
        }
        info!(user = %name, "signed in");
        self.balance = Money::ZERO;
        Ok(self.profile.insert(Profile {
            name: name.to_string(),
        }))
    }

    /// Ends the visit; nothing survives it.
    pub fn sign_out(&mut self) {
        if let Some(profile) = self.profile.take() {
            info!(user = %profile.name, "signed out");
        }
        self.balance = Money::ZERO;
        self.inventory.clear();
        self.stats = SessionStats::default();
        self.activity.clear();
    }

    pub fn add_funds(&mut self, amount: Money) -> Result<Money> {
        if self.profile.is_none() {
            return Err(Error::SignedOut);
        }
        if amount.is_zero() {
            return Err(Error::InvalidAmount("deposit must be positive".to_string()));
        }
        self.balance = self.balance.checked_add(amount)?;
        self.stats.deposited = self.stats.deposited.checked_add(amount)?;
        self.record(ActivityKind::Deposit, "Funds", amount);
        Ok(self.balance)
    }

    /// Pays for `case`, fixes the winner from the provably-fair stream and
    /// starts the reel. Nothing changes when the balance is short.
    pub fn open_case<R>(
        &mut self,
        case: &Case,
        config: &OpeningConfig,
        weights: &RarityWeights,
        policy: EmptyTierPolicy,
        cosmetic: &mut R,
    ) -> Result<Opening>
    where
        R: Rng + ?Sized,
    {
        config.validate()?;
        let balance = ledger::purchase(self.balance, case.price)?;

        let (mut fair, proof) = self.fairness.next_draw()?;
        let winner = resolver::resolve(case, weights, policy, &mut fair)?.clone();
        let roll = RollSequence::build(
            case,
            &winner,
            config.roll_length,
            config.winner_index,
            cosmetic,
        )?;

        self.balance = balance;
        self.stats.cases_opened += 1;
        self.stats.total_spent = self.stats.total_spent.checked_add(case.price)?;
        self.record(ActivityKind::Opened, case.name.clone(), case.price);
        info!(case = %case.id, price = %case.price, nonce = proof.nonce, "opened case");

        Ok(Opening::new(
            case.id.clone(),
            case.name.clone(),
            case.price,
            winner,
            roll,
            proof,
            *config,
        ))
    }

    /// Credits the winner and stops the reel. A second call is `NotSpinning`.
    pub fn reveal<'o>(&mut self, opening: &'o mut Opening) -> Result<&'o Item> {
        let won = opening.finish()?;
        self.stats.total_won = self.stats.total_won.checked_add(won.value)?;
        self.record(ActivityKind::Won, won.name.clone(), won.value);
        info!(item = %won.id, rarity = %won.rarity, value = %won.value, "revealed win");
        ledger::credit(&mut self.inventory, won);
        opening.revealed_item().ok_or(Error::NotSpinning)
    }

    pub fn sell(&mut self, item_id: &str) -> Result<Money> {
        let name = self
            .inventory
            .items()
            .iter()
            .rev()
            .find(|item| item.id == item_id)
            .map(|item| item.name.clone());
        let refund = ledger::sell(&mut self.inventory, item_id)?;
        self.credit_sale(refund)?;
        self.record(
            ActivityKind::Sold,
            name.unwrap_or_else(|| item_id.to_string()),
            refund,
        );
        Ok(refund)
    }

    /// All-or-nothing batch sale.
    pub fn sell_many<S>(&mut self, item_ids: &[S]) -> Result<Money>
    where
        S: AsRef<str>,
    {
        let refund = ledger::sell_many(&mut self.inventory, item_ids)?;
        self.credit_sale(refund)?;
        self.record(
            ActivityKind::Sold,
            format!("{} items", item_ids.len()),
            refund,
        );
        Ok(refund)
    }

    pub fn sell_all(&mut self) -> Result<Money> {
        let ids: Vec<String> = self
            .inventory
            .items()
            .iter()
            .map(|item| item.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(Money::ZERO);
        }
        self.sell_many(&ids)
    }

    fn credit_sale(&mut self, refund: Money) -> Result<()> {
        self.balance = self.balance.checked_add(refund)?;
        self.stats.total_sold = self.stats.total_sold.checked_add(refund)?;
        Ok(())
    }

    /// Buys into a waiting battle and plays it out at once.
    ///
    /// Free seats are filled from `bot_names`. If the player's team wins,
    /// every item pulled in the battle lands in the inventory.
    #[allow(clippy::too_many_arguments)]
    pub fn join_battle<R>(
        &mut self,
        lobby: &mut BattleLobby,
        battle_id: &str,
        catalog: &Catalog,
        weights: &RarityWeights,
        policy: EmptyTierPolicy,
        bot_names: impl IntoIterator<Item = String>,
        rng: &mut R,
    ) -> Result<BattleOutcome>
    where
        R: Rng + ?Sized,
    {
        let battle = lobby.get(battle_id)?;
        if !battle.is_joinable() {
            return Err(Error::BattleNotJoinable(battle_id.to_string()));
        }
        let case = catalog.get(&battle.case_id)?;
        let cost = battle.entry_cost(case)?;
        let balance = ledger::purchase(self.balance, cost)?;

        let player_name = self
            .profile
            .as_ref()
            .map_or("You", |profile| profile.name.as_str())
            .to_string();
        let (played, outcome) =
            battle::play(battle, case, &player_name, weights, policy, bot_names, rng)?;
        lobby.replace(played)?;

        self.balance = balance;
        self.stats.battles_played += 1;
        self.stats.total_spent = self.stats.total_spent.checked_add(cost)?;
        if outcome.player_won {
            let prize = outcome.prize();
            self.stats.battles_won += 1;
            self.stats.total_won = self.stats.total_won.checked_add(prize)?;
            for item in &outcome.winnings {
                ledger::credit(&mut self.inventory, item.clone());
            }
            self.record(ActivityKind::BattleWon, case.name.clone(), prize);
        } else {
            self.record(ActivityKind::BattleLost, case.name.clone(), cost);
        }
        Ok(outcome)
    }
}

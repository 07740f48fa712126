//! Mock case battles.
//!
//! Every seat opens the battle's case once per round. The team with the
//! highest combined pull value takes every item pulled.

use crate::{
    Case,
    Catalog,
    Error,
    Item,
    Money,
    RarityWeights,
    Result,
    resolver::{
        self,
        EmptyTierPolicy,
    },
};
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};
use std::fmt;
use tracing::info;

pub const MAX_ROUNDS: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleMode {
    OneVsOne,
    TwoVsTwo,
    FourWay,
}

impl BattleMode {
    pub const ALL: [BattleMode; 3] = [
        BattleMode::OneVsOne,
        BattleMode::TwoVsTwo,
        BattleMode::FourWay,
    ];

    pub fn seats(self) -> usize {
        match self {
            BattleMode::OneVsOne => 2,
            BattleMode::TwoVsTwo | BattleMode::FourWay => 4,
        }
    }

    pub fn teams(self) -> usize {
        match self {
            BattleMode::OneVsOne | BattleMode::TwoVsTwo => 2,
            BattleMode::FourWay => 4,
        }
    }

    /// Seats alternate teams, so seat `i` plays for team `i % teams`.
    pub fn team_of(self, seat: usize) -> usize {
        seat % self.teams()
    }
}

impl fmt::Display for BattleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BattleMode::OneVsOne => "1v1",
            BattleMode::TwoVsTwo => "2v2",
            BattleMode::FourWay => "1v1v1v1",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStatus {
    Waiting,
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seat {
    pub name: String,
    pub is_player: bool,
    pub pulls: Vec<Item>,
}

impl Seat {
    fn bot(name: impl Into<String>) -> Self {
        Seat {
            name: name.into(),
            is_player: false,
            pulls: Vec::new(),
        }
    }

    pub fn total(&self) -> Money {
        self.pulls.iter().map(|item| item.value).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Battle {
    pub id: String,
    pub name: String,
    pub mode: BattleMode,
    pub case_id: String,
    pub rounds: u32,
    pub seats: Vec<Seat>,
    pub status: BattleStatus,
    pub winning_team: Option<usize>,
}

impl Battle {
    pub fn entry_cost(&self, case: &Case) -> Result<Money> {
        case.price.checked_mul(u64::from(self.rounds))
    }

    pub fn open_seats(&self) -> usize {
        self.mode.seats().saturating_sub(self.seats.len())
    }

    pub fn is_joinable(&self) -> bool {
        self.status == BattleStatus::Waiting && self.open_seats() > 0
    }

    pub fn team_totals(&self) -> Vec<Money> {
        let mut totals = vec![Money::ZERO; self.mode.teams()];
        for (index, seat) in self.seats.iter().enumerate() {
            let team = self.mode.team_of(index);
            totals[team] = totals[team].checked_add(seat.total()).unwrap_or(totals[team]);
        }
        totals
    }

    /// Total value of every item pulled in the battle.
    pub fn pot(&self) -> Money {
        self.seats.iter().map(Seat::total).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleOutcome {
    pub battle_id: String,
    pub cost: Money,
    pub team_totals: Vec<Money>,
    pub winning_team: usize,
    pub player_team: usize,
    pub player_won: bool,
    /// Items credited to the player; empty on a loss.
    pub winnings: Vec<Item>,
}

impl BattleOutcome {
    pub fn prize(&self) -> Money {
        self.winnings.iter().map(|item| item.value).sum()
    }
}

/// Highest team total wins; ties go to the team holding the lowest seat.
fn winning_team(totals: &[Money]) -> usize {
    let mut best = 0;
    for (team, total) in totals.iter().enumerate() {
        if *total > totals[best] {
            best = team;
        }
    }
    best
}

/// Seats the player, fills the table with bots and plays every round.
pub(crate) fn play<R>(
    battle: &Battle,
    case: &Case,
    player_name: &str,
    weights: &RarityWeights,
    policy: EmptyTierPolicy,
    bot_names: impl IntoIterator<Item = String>,
    rng: &mut R,
) -> Result<(Battle, BattleOutcome)>
where
    R: Rng + ?Sized,
{
    if !battle.is_joinable() {
        return Err(Error::BattleNotJoinable(battle.id.clone()));
    }
    let mut played = battle.clone();
    let player_seat = played.seats.len();
    played.seats.push(Seat {
        name: player_name.to_string(),
        is_player: true,
        pulls: Vec::new(),
    });
    let mut bot_names = bot_names.into_iter();
    while played.seats.len() < played.mode.seats() {
        let name = bot_names
            .next()
            .unwrap_or_else(|| format!("Bot {}", played.seats.len()));
        played.seats.push(Seat::bot(name));
    }

    for _ in 0..played.rounds {
        for seat in played.seats.iter_mut() {
            let pull = resolver::resolve(case, weights, policy, rng)?;
            seat.pulls.push(pull.clone());
        }
    }

    let team_totals = played.team_totals();
    let winner = winning_team(&team_totals);
    let player_team = played.mode.team_of(player_seat);
    let player_won = winner == player_team;
    let winnings = if player_won {
        played
            .seats
            .iter()
            .flat_map(|seat| seat.pulls.iter().cloned())
            .collect()
    } else {
        Vec::new()
    };
    played.status = BattleStatus::Finished;
    played.winning_team = Some(winner);

    info!(battle = %played.id, winner, player_won, "battle finished");
    let outcome = BattleOutcome {
        battle_id: played.id.clone(),
        cost: played.entry_cost(case)?,
        team_totals,
        winning_team: winner,
        player_team,
        player_won,
        winnings,
    };
    Ok((played, outcome))
}

#[derive(Clone, Debug, Default)]
pub struct BattleLobby {
    battles: Vec<Battle>,
    next_id: u64,
}

impl BattleLobby {
    /// The lobby as the storefront opens it.
    pub fn storefront() -> Self {
        let seated = |names: &[&str]| -> Vec<Seat> {
            names.iter().map(|n| Seat::bot(*n)).collect()
        };
        let battles = vec![
            Battle {
                id: "1".to_string(),
                name: "Epic Showdown".to_string(),
                mode: BattleMode::OneVsOne,
                case_id: "3".to_string(),
                rounds: 3,
                seats: seated(&["ProGamer"]),
                status: BattleStatus::Waiting,
                winning_team: None,
            },
            Battle {
                id: "2".to_string(),
                name: "Tech Warriors".to_string(),
                mode: BattleMode::TwoVsTwo,
                case_id: "27".to_string(),
                rounds: 5,
                seats: seated(&["TechKing", "GamerX", "LootMaster"]),
                status: BattleStatus::Waiting,
                winning_team: None,
            },
            Battle {
                id: "3".to_string(),
                name: "Luxury Battle".to_string(),
                mode: BattleMode::FourWay,
                case_id: "7".to_string(),
                rounds: 3,
                seats: seated(&["CaseWizard", "RNGesus", "MythicHunter", "UnboxKing"]),
                status: BattleStatus::Finished,
                winning_team: None,
            },
        ];
        BattleLobby {
            next_id: battles.len() as u64 + 1,
            battles,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Battle> {
        self.battles.iter()
    }

    pub fn len(&self) -> usize {
        self.battles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.battles.is_empty()
    }

    /// All battles when `status` is `None`.
    pub fn filter(&self, status: Option<BattleStatus>) -> Vec<&Battle> {
        self.battles
            .iter()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .collect()
    }

    pub fn get(&self, battle_id: &str) -> Result<&Battle> {
        self.battles
            .iter()
            .find(|b| b.id == battle_id)
            .ok_or_else(|| Error::BattleNotFound(battle_id.to_string()))
    }

    pub(crate) fn replace(&mut self, battle: Battle) -> Result<()> {
        let slot = self
            .battles
            .iter_mut()
            .find(|b| b.id == battle.id)
            .ok_or_else(|| Error::BattleNotFound(battle.id.clone()))?;
        *slot = battle;
        Ok(())
    }

    /// Opens an empty battle on a catalog case.
    pub fn create(
        &mut self,
        catalog: &Catalog,
        name: &str,
        mode: BattleMode,
        case_id: &str,
        rounds: u32,
    ) -> Result<&Battle> {
        if !(1..=MAX_ROUNDS).contains(&rounds) {
            return Err(Error::Definition(format!(
                "battles run 1 to {MAX_ROUNDS} rounds, got {rounds}"
            )));
        }
        let case = catalog.get(case_id)?;
        let name = match name.trim() {
            "" => format!("{} Battle", case.name),
            given => given.to_string(),
        };
        let battle = Battle {
            id: self.next_id.to_string(),
            name,
            mode,
            case_id: case.id.clone(),
            rounds,
            seats: Vec::new(),
            status: BattleStatus::Waiting,
            winning_team: None,
        };
        self.next_id += 1;
        info!(battle = %battle.id, %mode, case = %battle.case_id, rounds, "battle created");
        self.battles.push(battle);
        let index = self.battles.len() - 1;
        Ok(&self.battles[index])
    }
}

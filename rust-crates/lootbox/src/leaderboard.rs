//! Weekly wagering race.

use crate::{
    Money,
    session::Session,
};
use chrono::{
    DateTime,
    Datelike,
    Days,
    NaiveTime,
    Utc,
};

/// Prize in dollars for each final rank, first place first.
pub const PRIZES: [u64; 12] = [1250, 400, 150, 100, 75, 50, 40, 35, 30, 25, 20, 15];

// (username, wagered cents, cases opened, win rate %)
const WEEKLY: [(&str, u64, u32, u8); 12] = [
    ("1lagemfonseca", 4_662_950, 892, 68),
    ("Masking", 5_293_515, 1034, 64),
    ("scarfedodds51", 2_511_813, 567, 71),
    ("GoldenLuck", 1_845_020, 423, 59),
    ("ProUnboxer", 1_523_080, 389, 62),
    ("MythicHunter", 1_289_045, 312, 57),
    ("CaseWizard", 1_124_590, 298, 66),
    ("LegendaryPro", 1_012_030, 267, 54),
    ("RNGesus", 945_075, 245, 69),
    ("UnboxKing", 892_060, 229, 61),
    ("LootMaster", 782_540, 198, 58),
    ("CrateChaser", 678_920, 176, 52),
];

#[derive(Clone, Debug, PartialEq)]
pub struct Standing {
    pub rank: usize,
    pub username: String,
    pub wagered: Money,
    pub cases_opened: u32,
    pub win_rate: f64,
    pub prize: Money,
    pub is_player: bool,
}

pub fn prize_for(rank: usize) -> Money {
    rank.checked_sub(1)
        .and_then(|index| PRIZES.get(index))
        .map_or(Money::ZERO, |dollars| Money::from_cents(dollars * 100))
}

/// This week's table with the signed-in player ranked among the regulars.
pub fn standings(session: &Session) -> Vec<Standing> {
    let mut rows: Vec<Standing> = WEEKLY
        .iter()
        .map(|(name, cents, cases, rate)| Standing {
            rank: 0,
            username: (*name).to_string(),
            wagered: Money::from_cents(*cents),
            cases_opened: *cases,
            win_rate: f64::from(*rate),
            prize: Money::ZERO,
            is_player: false,
        })
        .collect();

    if let Some(profile) = session.profile() {
        let stats = session.stats();
        rows.push(Standing {
            rank: 0,
            username: profile.name.clone(),
            wagered: stats.total_spent,
            cases_opened: stats.cases_opened,
            win_rate: stats.win_rate(),
            prize: Money::ZERO,
            is_player: true,
        });
    }

    rank(&mut rows);
    rows
}

/// Orders by wagered, highest first, breaking ties by name.
fn rank(rows: &mut [Standing]) {
    rows.sort_by(|a, b| {
        b.wagered
            .cmp(&a.wagered)
            .then_with(|| a.username.cmp(&b.username))
    });
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index + 1;
        row.prize = prize_for(row.rank);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

/// Next Monday 00:00 UTC strictly after `now`.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let ahead = 7 - u64::from(now.weekday().num_days_from_monday());
    (now.date_naive() + Days::new(ahead))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

pub fn countdown(now: DateTime<Utc>) -> Countdown {
    let left = (next_reset(now) - now).num_seconds().max(0);
    Countdown {
        days: left / 86_400,
        hours: left % 86_400 / 3_600,
        minutes: left % 3_600 / 60,
        seconds: left % 60,
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::{
        config::StoreConfig,
        fairness::FairnessState,
    };
    use chrono::TimeZone;

    #[test]
    fn standings__rank_by_wagered_without_player() {
        // given
        let session = Session::new(&StoreConfig::default());

        // when
        let rows = standings(&session);

        // then
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].username, "Masking");
        assert_eq!(rows[0].prize, Money::from_cents(125_000));
        assert_eq!(rows[1].username, "1lagemfonseca");
        assert_eq!(rows[11].prize, Money::from_cents(1_500));
    }

    #[test]
    fn standings__includes_signed_in_player() {
        let mut session = Session::with_fairness(Money::ZERO, FairnessState::default());
        session.sign_in("newbie@example.com").unwrap();

        let rows = standings(&session);

        assert_eq!(rows.len(), 13);
        let me = rows.iter().find(|r| r.is_player).unwrap();
        assert_eq!(me.rank, 13);
        assert_eq!(me.prize, Money::ZERO);
    }

    fn row(username: &str, cents: u64) -> Standing {
        Standing {
            rank: 0,
            username: username.to_string(),
            wagered: Money::from_cents(cents),
            cases_opened: 0,
            win_rate: 0.0,
            prize: Money::ZERO,
            is_player: false,
        }
    }

    #[test]
    fn rank__breaks_equal_wagers_by_name() {
        // given
        let mut rows = vec![row("zed", 500), row("amy", 500), row("big", 900)];

        // when
        rank(&mut rows);

        // then
        let order: Vec<(&str, usize)> = rows
            .iter()
            .map(|r| (r.username.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("big", 1), ("amy", 2), ("zed", 3)]);
        assert_eq!(rows[1].prize, Money::from_cents(40_000));
    }

    #[test]
    fn countdown__runs_to_next_monday_midnight() {
        // given
        // 2026-10-19 is a Monday
        let monday_noon = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let sunday_late = Utc.with_ymd_and_hms(2026, 10, 25, 23, 59, 30).unwrap();
        let monday_midnight = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

        // then
        assert_eq!(
            countdown(monday_noon),
            Countdown { days: 6, hours: 12, minutes: 0, seconds: 0 }
        );
        assert_eq!(
            countdown(sunday_late),
            Countdown { days: 0, hours: 0, minutes: 0, seconds: 30 }
        );
        assert_eq!(countdown(monday_midnight).days, 7);
    }
}

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::tier::TierStatus;

pub type TeamId = u32;
pub type SeasonId = u32;
pub type LeagueId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub league_id: Option<LeagueId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    /// Country letters followed by a tier digit, e.g. `E0`.
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    /// `"2023/2024"`.
    pub label: String,
}

impl Season {
    pub fn years(&self) -> Option<(i32, i32)> {
        parse_season_label(&self.label)
    }

    pub fn previous_label(&self) -> Option<String> {
        let (start, end) = self.years()?;
        Some(format!("{}/{}", start.checked_sub(1)?, end.checked_sub(1)?))
    }
}

pub fn parse_season_label(label: &str) -> Option<(i32, i32)> {
    let (start, end) = label.trim().split_once('/')?;
    let start = start.trim().parse::<i32>().ok()?;
    let end = end.trim().parse::<i32>().ok()?;
    Some((start, end))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandingSource {
    InProgress,
    Final,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonStanding {
    pub team_id: TeamId,
    pub season_id: SeasonId,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FullTimeResult {
    Home,
    Draw,
    Away,
}

impl FullTimeResult {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "H" | "h" => Some(Self::Home),
            "D" | "d" => Some(Self::Draw),
            "A" | "a" => Some(Self::Away),
            _ => None,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Home => "H",
            Self::Draw => "D",
            Self::Away => "A",
        }
    }

    pub fn from_goals(home: u32, away: u32) -> Self {
        if home > away {
            Self::Home
        } else if home < away {
            Self::Away
        } else {
            Self::Draw
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub full_time_home_goals: u32,
    pub full_time_away_goals: u32,
    pub full_time_result: FullTimeResult,
    pub half_time_home_goals: u32,
    pub half_time_away_goals: u32,
    pub shots_home: u32,
    pub shots_away: u32,
    pub shots_on_target_home: u32,
    pub shots_on_target_away: u32,
    pub fouls_home: u32,
    pub fouls_away: u32,
    pub corners_home: u32,
    pub corners_away: u32,
    pub yellow_cards_home: u32,
    pub yellow_cards_away: u32,
    pub red_cards_home: u32,
    pub red_cards_away: u32,
}

impl MatchStatistics {
    pub fn stat(&self, key: StatKey, side: Side) -> u32 {
        match (key, side) {
            (StatKey::Corners, Side::Home) => self.corners_home,
            (StatKey::Corners, Side::Away) => self.corners_away,
            (StatKey::ShotsOnTarget, Side::Home) => self.shots_on_target_home,
            (StatKey::ShotsOnTarget, Side::Away) => self.shots_on_target_away,
        }
    }

    pub fn goals(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.full_time_home_goals,
            Side::Away => self.full_time_away_goals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: u64,
    pub date: NaiveDate,
    pub league_id: Option<LeagueId>,
    pub season_id: Option<SeasonId>,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub statistics: Option<MatchStatistics>,
}

impl Match {
    pub fn result(&self) -> Option<FullTimeResult> {
        self.statistics.as_ref().map(|s| s.full_time_result)
    }
}

/// An upcoming fixture waiting for an estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub season_id: SeasonId,
    pub league_id: Option<LeagueId>,
    #[serde(default)]
    pub league_code: Option<String>,
}

impl Fixture {
    pub fn key(&self) -> FixtureKey {
        FixtureKey {
            date: self.date,
            time: self.time,
            home_team_id: self.home_team_id,
            away_team_id: self.away_team_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FixtureKey {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKey {
    Corners,
    ShotsOnTarget,
}

impl StatKey {
    pub const ALL: [StatKey; 2] = [StatKey::Corners, StatKey::ShotsOnTarget];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Corners => "corners",
            Self::ShotsOnTarget => "shots_on_target",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "corners" => Some(Self::Corners),
            "shots_on_target" => Some(Self::ShotsOnTarget),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Home, Side::Away];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "home" => Some(Self::Home),
            "away" => Some(Self::Away),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSample {
    pub minute: u16,
    pub value: f64,
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBand {
    pub stat: StatKey,
    pub side: Side,
    pub samples: Vec<StatSample>,
    pub goal_correlation: f64,
}

/// Home/draw/away distribution. Every constructor keeps the three parts
/// summing to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityEstimate {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

pub const SUM_TOLERANCE: f64 = 1e-6;

impl ProbabilityEstimate {
    pub fn uniform() -> Self {
        Self {
            home: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            away: 1.0 / 3.0,
        }
    }

    /// Away is the complement of home and draw.
    pub fn from_home_draw(home: f64, draw: f64) -> Self {
        Self {
            home,
            draw,
            away: 1.0 - home - draw,
        }
    }

    /// Clamp every part to [0, 1] and renormalize. A degenerate input (all
    /// parts clamp to zero) becomes uniform.
    pub fn reconciled(self) -> Self {
        let home = finite_unit(self.home);
        let draw = finite_unit(self.draw);
        let away = finite_unit(self.away);
        let sum = home + draw + away;
        if sum <= 0.0 {
            return Self::uniform();
        }
        let home = home / sum;
        let away = away / sum;
        // Put the rounding residue into draw.
        Self {
            home,
            draw: (1.0 - home - away).max(0.0),
            away,
        }
    }

    pub fn sum(&self) -> f64 {
        self.home + self.draw + self.away
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= SUM_TOLERANCE
    }

    pub fn get(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    pub fn max(&self) -> f64 {
        self.home.max(self.draw).max(self.away)
    }
}

fn finite_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureEstimate {
    pub key: FixtureKey,
    pub estimate: ProbabilityEstimate,
    pub bands: Vec<StatBand>,
    pub home_status: TierStatus,
    pub away_status: TierStatus,
}

/// Decimal bookmaker prices for one fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookmakerOdds {
    pub key: FixtureKey,
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_label_decrements_both_years() {
        let season = Season {
            id: 1,
            label: "2023/2024".to_string(),
        };
        assert_eq!(season.previous_label().as_deref(), Some("2022/2023"));
    }

    #[test]
    fn malformed_label_has_no_previous() {
        let season = Season {
            id: 1,
            label: "2023-24".to_string(),
        };
        assert!(season.previous_label().is_none());
    }

    #[test]
    fn label_at_year_floor_has_no_previous() {
        let season = Season {
            id: 1,
            label: format!("{}/0", i32::MIN),
        };
        assert!(season.previous_label().is_none());
    }

    #[test]
    fn full_time_result_codes() {
        assert_eq!(FullTimeResult::parse("H"), Some(FullTimeResult::Home));
        assert_eq!(FullTimeResult::parse(" D "), Some(FullTimeResult::Draw));
        assert_eq!(FullTimeResult::parse("x"), None);
        assert_eq!(FullTimeResult::from_goals(0, 2), FullTimeResult::Away);
    }

    #[test]
    fn reconciled_bounds_negative_away() {
        let p = ProbabilityEstimate::from_home_draw(0.9, 0.3).reconciled();
        assert!(p.away >= 0.0);
        assert!(p.home <= 1.0);
        assert!(p.is_normalized());
    }

    #[test]
    fn reconciled_degenerate_is_uniform() {
        let p = ProbabilityEstimate {
            home: f64::NAN,
            draw: -1.0,
            away: 0.0,
        }
        .reconciled();
        assert_eq!(p, ProbabilityEstimate::uniform());
    }
}

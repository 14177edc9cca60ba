#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime};

use odds_engine::model::{
    Fixture, FullTimeResult, Match, MatchStatistics, Season, SeasonStanding, Team, TeamId,
};
use odds_engine::store::MemoryStore;

pub const PRIOR_SEASON: u32 = 1;
pub const CURRENT_SEASON: u32 = 2;
pub const TEAM_A: TeamId = 1;
pub const TEAM_B: TeamId = 2;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn team(id: TeamId, name: &str) -> Team {
    Team {
        id,
        name: name.to_string(),
        league_id: None,
    }
}

pub fn standing(team_id: TeamId, season_id: u32, record: (u32, u32, u32, u32)) -> SeasonStanding {
    let (played, wins, draws, losses) = record;
    SeasonStanding {
        team_id,
        season_id,
        played,
        wins,
        draws,
        losses,
        points: wins * 3 + draws,
    }
}

pub fn fixture(home: TeamId, away: TeamId, date: NaiveDate) -> Fixture {
    Fixture {
        date,
        time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        home_team_id: home,
        away_team_id: away,
        season_id: CURRENT_SEASON,
        league_id: None,
        league_code: Some("E0".to_string()),
    }
}

pub fn meeting(id: u64, home: TeamId, away: TeamId, date: NaiveDate, goals: (u32, u32)) -> Match {
    let (hg, ag) = goals;
    Match {
        id,
        date,
        league_id: None,
        season_id: None,
        home_team_id: home,
        away_team_id: away,
        statistics: Some(MatchStatistics {
            full_time_home_goals: hg,
            full_time_away_goals: ag,
            full_time_result: FullTimeResult::from_goals(hg, ag),
            half_time_home_goals: hg.min(1),
            half_time_away_goals: ag.min(1),
            shots_home: 10 + hg,
            shots_away: 8 + ag,
            shots_on_target_home: 3 + 2 * hg,
            shots_on_target_away: 2 + 2 * ag,
            fouls_home: 11,
            fouls_away: 12,
            corners_home: 5 + hg,
            corners_away: 4,
            yellow_cards_home: 2,
            yellow_cards_away: 1,
            red_cards_home: 0,
            red_cards_away: 0,
        }),
    }
}

/// Two seasons and two teams: A stayed in E0, B came up from E1.
pub fn base_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.seasons.push(Season {
        id: PRIOR_SEASON,
        label: "2023/2024".to_string(),
    });
    store.seasons.push(Season {
        id: CURRENT_SEASON,
        label: "2024/2025".to_string(),
    });
    store.teams.push(team(TEAM_A, "Team A"));
    store.teams.push(team(TEAM_B, "Team B"));
    store.team_leagues.insert((TEAM_A, PRIOR_SEASON), "E0".to_string());
    store.team_leagues.insert((TEAM_A, CURRENT_SEASON), "E0".to_string());
    store.team_leagues.insert((TEAM_B, PRIOR_SEASON), "E1".to_string());
    store.team_leagues.insert((TEAM_B, CURRENT_SEASON), "E0".to_string());
    store
}

/// A 10/6/2/2 and B 10/3/3/4 this season, no prior tables, no meetings.
pub fn team_a_team_b() -> MemoryStore {
    let mut store = base_store();
    store
        .standings
        .insert((TEAM_A, CURRENT_SEASON), standing(TEAM_A, CURRENT_SEASON, (10, 6, 2, 2)));
    store
        .standings
        .insert((TEAM_B, CURRENT_SEASON), standing(TEAM_B, CURRENT_SEASON, (10, 3, 3, 4)));
    store.fixtures.push(fixture(TEAM_A, TEAM_B, day(2024, 9, 14)));
    store
}

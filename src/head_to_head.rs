use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{FullTimeResult, Match, TeamId};
use crate::performance::ratio;
use crate::store::DataStore;

/// Results of `home` hosting `away`. The reverse fixture is a different
/// record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadToHeadRecord {
    pub home_wins: u32,
    pub away_wins: u32,
    pub draws: u32,
    pub total_matches: u32,
    pub home_win_ratio: f64,
    pub away_win_ratio: f64,
    pub draw_ratio: f64,
}

impl HeadToHeadRecord {
    pub fn from_matches(matches: &[Match]) -> Self {
        let mut home_wins = 0u32;
        let mut away_wins = 0u32;
        let mut draws = 0u32;
        for m in matches {
            match m.result() {
                Some(FullTimeResult::Home) => home_wins += 1,
                Some(FullTimeResult::Away) => away_wins += 1,
                Some(FullTimeResult::Draw) => draws += 1,
                None => {}
            }
        }
        let total_matches = matches.len() as u32;
        Self {
            home_wins,
            away_wins,
            draws,
            total_matches,
            home_win_ratio: ratio(home_wins, total_matches),
            away_win_ratio: ratio(away_wins, total_matches),
            draw_ratio: ratio(draws, total_matches),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_matches == 0
    }
}

pub fn record(
    store: &dyn DataStore,
    home: TeamId,
    away: TeamId,
    limit: usize,
) -> Result<HeadToHeadRecord> {
    let meetings = store.get_matches(home, away, Some(limit))?;
    // Guard against a store that ignores the limit or returns reversed rows.
    let meetings: Vec<Match> = meetings
        .into_iter()
        .filter(|m| m.home_team_id == home && m.away_team_id == away)
        .take(limit)
        .collect();
    Ok(HeadToHeadRecord::from_matches(&meetings))
}

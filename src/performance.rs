use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::model::{SeasonId, SeasonStanding, StandingSource, Team};
use crate::store::DataStore;

/// A team's record over one season, with per-match rates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeasonPerformance {
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub wins_ratio: f64,
    pub draws_ratio: f64,
    pub losses_ratio: f64,
    pub source: Option<StandingSource>,
}

impl SeasonPerformance {
    pub fn from_counts(played: u32, wins: u32, draws: u32, losses: u32) -> Self {
        Self {
            played,
            wins,
            draws,
            losses,
            wins_ratio: ratio(wins, played),
            draws_ratio: ratio(draws, played),
            losses_ratio: ratio(losses, played),
            source: None,
        }
    }

    pub fn from_standing(standing: &SeasonStanding, source: StandingSource) -> Self {
        Self {
            source: Some(source),
            ..Self::from_counts(standing.played, standing.wins, standing.draws, standing.losses)
        }
    }

    /// No record anywhere: zero everywhere, which downstream reads as "no
    /// signal".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_signal(&self) -> bool {
        self.played > 0
    }
}

pub(crate) fn ratio(n: u32, d: u32) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 }
}

/// In-progress table, then final standings, then the reference snapshot.
pub fn resolve(
    store: &dyn DataStore,
    team: &Team,
    season_id: SeasonId,
) -> Result<SeasonPerformance> {
    if let Some(row) = store.get_standing(team.id, season_id)? {
        return Ok(SeasonPerformance::from_standing(&row, StandingSource::InProgress));
    }
    if let Some(row) = store.get_final_standing(team.id, season_id)? {
        return Ok(SeasonPerformance::from_standing(&row, StandingSource::Final));
    }
    if let Some(row) = store.get_reference_standing(team)? {
        return Ok(SeasonPerformance::from_standing(&row, StandingSource::Reference));
    }
    Ok(SeasonPerformance::empty())
}

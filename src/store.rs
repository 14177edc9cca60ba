use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use chrono::NaiveDateTime;

use crate::model::{
    BookmakerOdds, Fixture, FixtureEstimate, FixtureKey, Match, Season, SeasonId, SeasonStanding,
    Team, TeamId,
};
use crate::orchestrator::BatchSummary;
use crate::reference::ReferenceTable;

/// Read side of the data store plus the single write the engine performs.
/// Implementations must be shareable across worker threads.
pub trait DataStore: Send + Sync {
    fn get_fixtures(&self, after: NaiveDateTime) -> Result<Vec<Fixture>>;
    fn get_season(&self, season_id: SeasonId) -> Result<Option<Season>>;
    fn find_season_by_label(&self, label: &str) -> Result<Option<Season>>;
    fn get_team(&self, team_id: TeamId) -> Result<Option<Team>>;
    /// In-progress league table row.
    fn get_standing(&self, team_id: TeamId, season_id: SeasonId)
    -> Result<Option<SeasonStanding>>;
    /// Completed-season table row.
    fn get_final_standing(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
    ) -> Result<Option<SeasonStanding>>;
    /// Reference snapshot row, matched by display name through the alias table.
    fn get_reference_standing(&self, team: &Team) -> Result<Option<SeasonStanding>>;
    fn get_team_league(&self, team_id: TeamId, season_id: SeasonId) -> Result<Option<String>>;
    /// Meetings with `home` at home and `away` away, newest first.
    fn get_matches(&self, home: TeamId, away: TeamId, limit: Option<usize>) -> Result<Vec<Match>>;
    /// Upsert keyed by `FixtureKey`.
    fn save_estimate(&self, estimate: &FixtureEstimate) -> Result<()>;
    fn list_estimates(&self) -> Result<Vec<FixtureEstimate>>;
    fn get_bookmaker_odds(&self, key: &FixtureKey) -> Result<Option<BookmakerOdds>>;
    /// Bookkeeping for a finished batch. Stores without a run log ignore it.
    fn record_run(&self, _summary: &BatchSummary) -> Result<()> {
        Ok(())
    }
}

/// In-process store used by tests, benches and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    pub fixtures: Vec<Fixture>,
    pub seasons: Vec<Season>,
    pub teams: Vec<Team>,
    pub standings: HashMap<(TeamId, SeasonId), SeasonStanding>,
    pub final_standings: HashMap<(TeamId, SeasonId), SeasonStanding>,
    pub team_leagues: HashMap<(TeamId, SeasonId), String>,
    pub matches: Vec<Match>,
    pub odds: HashMap<FixtureKey, BookmakerOdds>,
    pub reference: Option<ReferenceTable>,
    /// Keys listed here fail on save, for exercising rollback paths.
    pub fail_saves: Vec<FixtureKey>,
    estimates: Mutex<BTreeMap<FixtureKey, FixtureEstimate>>,
    runs: Mutex<Vec<BatchSummary>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<FixtureEstimate> {
        self.estimates
            .lock()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn runs(&self) -> Vec<BatchSummary> {
        self.runs.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl DataStore for MemoryStore {
    fn get_fixtures(&self, after: NaiveDateTime) -> Result<Vec<Fixture>> {
        let mut out: Vec<Fixture> = self
            .fixtures
            .iter()
            .filter(|f| f.date.and_time(f.time) > after)
            .cloned()
            .collect();
        out.sort_by_key(|f| f.key());
        Ok(out)
    }

    fn get_season(&self, season_id: SeasonId) -> Result<Option<Season>> {
        Ok(self.seasons.iter().find(|s| s.id == season_id).cloned())
    }

    fn find_season_by_label(&self, label: &str) -> Result<Option<Season>> {
        Ok(self.seasons.iter().find(|s| s.label == label).cloned())
    }

    fn get_team(&self, team_id: TeamId) -> Result<Option<Team>> {
        Ok(self.teams.iter().find(|t| t.id == team_id).cloned())
    }

    fn get_standing(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
    ) -> Result<Option<SeasonStanding>> {
        Ok(self.standings.get(&(team_id, season_id)).cloned())
    }

    fn get_final_standing(
        &self,
        team_id: TeamId,
        season_id: SeasonId,
    ) -> Result<Option<SeasonStanding>> {
        Ok(self.final_standings.get(&(team_id, season_id)).cloned())
    }

    fn get_reference_standing(&self, team: &Team) -> Result<Option<SeasonStanding>> {
        Ok(self
            .reference
            .as_ref()
            .and_then(|r| r.standing_for(team.id, &team.name)))
    }

    fn get_team_league(&self, team_id: TeamId, season_id: SeasonId) -> Result<Option<String>> {
        Ok(self.team_leagues.get(&(team_id, season_id)).cloned())
    }

    fn get_matches(&self, home: TeamId, away: TeamId, limit: Option<usize>) -> Result<Vec<Match>> {
        let mut out: Vec<Match> = self
            .matches
            .iter()
            .filter(|m| m.home_team_id == home && m.away_team_id == away)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    fn save_estimate(&self, estimate: &FixtureEstimate) -> Result<()> {
        if self.fail_saves.contains(&estimate.key) {
            return Err(anyhow!("simulated save failure"));
        }
        let mut guard = self
            .estimates
            .lock()
            .map_err(|_| anyhow!("estimate store lock poisoned"))?;
        guard.insert(estimate.key, estimate.clone());
        Ok(())
    }

    fn list_estimates(&self) -> Result<Vec<FixtureEstimate>> {
        Ok(self.saved())
    }

    fn get_bookmaker_odds(&self, key: &FixtureKey) -> Result<Option<BookmakerOdds>> {
        Ok(self.odds.get(key).copied())
    }

    fn record_run(&self, summary: &BatchSummary) -> Result<()> {
        self.runs
            .lock()
            .map_err(|_| anyhow!("run log lock poisoned"))?
            .push(summary.clone());
        Ok(())
    }
}

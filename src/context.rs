use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use anyhow::Result;

use crate::config::EngineConfig;
use crate::model::{Fixture, Season, SeasonId, TeamId};
use crate::store::DataStore;

/// Everything one fixture's calculation reads. Built once, never mutated,
/// and handed to each stage explicitly.
#[derive(Debug, Clone)]
pub struct CalculationContext<'a> {
    pub fixture: &'a Fixture,
    pub season: Season,
    pub prior_season: Option<Season>,
    pub config: &'a EngineConfig,
}

/// Read-mostly lookups shared by the workers of one batch run.
#[derive(Default)]
pub struct LookupCache {
    seasons: RwLock<HashMap<SeasonId, Option<Season>>>,
    seasons_by_label: RwLock<HashMap<String, Option<Season>>>,
    team_leagues: RwLock<HashMap<(TeamId, SeasonId), Option<String>>>,
}

fn cached<K, V>(
    map: &RwLock<HashMap<K, V>>,
    key: K,
    load: impl FnOnce() -> Result<V>,
) -> Result<V>
where
    K: Eq + Hash,
    V: Clone,
{
    if let Ok(guard) = map.read()
        && let Some(hit) = guard.get(&key)
    {
        return Ok(hit.clone());
    }
    let value = load()?;
    if let Ok(mut guard) = map.write() {
        guard.insert(key, value.clone());
    }
    Ok(value)
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn season(&self, store: &dyn DataStore, id: SeasonId) -> Result<Option<Season>> {
        cached(&self.seasons, id, || store.get_season(id))
    }

    pub fn season_by_label(&self, store: &dyn DataStore, label: &str) -> Result<Option<Season>> {
        cached(&self.seasons_by_label, label.to_string(), || {
            store.find_season_by_label(label)
        })
    }

    pub fn team_league(
        &self,
        store: &dyn DataStore,
        team_id: TeamId,
        season_id: SeasonId,
    ) -> Result<Option<String>> {
        cached(&self.team_leagues, (team_id, season_id), || {
            store.get_team_league(team_id, season_id)
        })
    }

    pub fn len(&self) -> usize {
        let count = |n: Option<usize>| n.unwrap_or(0);
        count(self.seasons.read().ok().map(|g| g.len()))
            + count(self.seasons_by_label.read().ok().map(|g| g.len()))
            + count(self.team_leagues.read().ok().map(|g| g.len()))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

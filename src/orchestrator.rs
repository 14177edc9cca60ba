use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combiner;
use crate::config::EngineConfig;
use crate::context::{CalculationContext, LookupCache};
use crate::error::EngineError;
use crate::head_to_head::{self, HeadToHeadRecord};
use crate::model::{Fixture, FixtureEstimate, Team, TeamId};
use crate::performance::{self, SeasonPerformance};
use crate::stat_band;
use crate::store::DataStore;
use crate::tier::{self, TierMovement, TierStatus};
use crate::weighting::{self, SignalRatio, WeightedRatios};

/// Counts for one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fixtures: usize,
    pub saved: usize,
    /// Missing season or team.
    pub skipped: usize,
    /// Store errors while computing.
    pub failed: usize,
    pub save_failures: usize,
}

/// One side of a fixture, fully resolved.
#[derive(Debug, Clone)]
pub struct SideSnapshot {
    pub team: Team,
    pub current: SeasonPerformance,
    pub prior: SeasonPerformance,
    pub status: TierStatus,
    pub movement: TierMovement,
}

enum Outcome {
    Saved,
    Skipped,
    Failed,
    SaveFailed,
}

pub fn build_context<'a>(
    store: &dyn DataStore,
    cache: &LookupCache,
    fixture: &'a Fixture,
    cfg: &'a EngineConfig,
) -> Result<CalculationContext<'a>, EngineError> {
    let season = cache
        .season(store, fixture.season_id)?
        .ok_or(EngineError::MissingSeason(fixture.season_id))?;
    let prior_season = match season.previous_label() {
        Some(label) => cache.season_by_label(store, &label)?,
        None => None,
    };
    Ok(CalculationContext {
        fixture,
        season,
        prior_season,
        config: cfg,
    })
}

fn team(store: &dyn DataStore, id: TeamId) -> Result<Team, EngineError> {
    store.get_team(id)?.ok_or(EngineError::MissingTeam(id))
}

pub fn resolve_side(
    store: &dyn DataStore,
    cache: &LookupCache,
    ctx: &CalculationContext<'_>,
    team: Team,
) -> Result<SideSnapshot, EngineError> {
    let current = performance::resolve(store, &team, ctx.season.id)?;
    let prior = match &ctx.prior_season {
        Some(prior) => performance::resolve(store, &team, prior.id)?,
        None => SeasonPerformance::empty(),
    };

    let current_code = match cache.team_league(store, team.id, ctx.season.id)? {
        Some(code) => Some(code),
        None => ctx.fixture.league_code.clone(),
    };
    let last_code = match &ctx.prior_season {
        Some(prior) => cache.team_league(store, team.id, prior.id)?,
        None => None,
    };
    let status = tier::classify_team(last_code.as_deref(), current_code.as_deref());
    let movement = tier::movement(last_code.as_deref(), current_code.as_deref());

    debug!(
        team = %team.name,
        played = current.played,
        prior_played = prior.played,
        status = status.as_str(),
        "resolved side"
    );
    Ok(SideSnapshot {
        team,
        current,
        prior,
        status,
        movement,
    })
}

/// Run the full pipeline for one fixture without persisting anything.
pub fn estimate_fixture(
    store: &dyn DataStore,
    cache: &LookupCache,
    fixture: &Fixture,
    cfg: &EngineConfig,
) -> Result<FixtureEstimate, EngineError> {
    let ctx = build_context(store, cache, fixture, cfg)?;
    let home_team = team(store, fixture.home_team_id)?;
    let away_team = team(store, fixture.away_team_id)?;

    let home = resolve_side(store, cache, &ctx, home_team)?;
    let away = resolve_side(store, cache, &ctx, away_team)?;

    let h2h: HeadToHeadRecord = head_to_head::record(
        store,
        fixture.home_team_id,
        fixture.away_team_id,
        ctx.config.h2h_limit,
    )?;

    let home_ratios: WeightedRatios = weighting::weigh(
        &home.current,
        &home.prior,
        home.movement,
        SignalRatio::Wins,
        ctx.config,
    );
    let away_ratios: WeightedRatios = weighting::weigh(
        &away.current,
        &away.prior,
        away.movement,
        SignalRatio::Losses,
        ctx.config,
    );

    let estimate = combiner::estimate(
        &home_ratios,
        &away_ratios,
        &h2h,
        home.status,
        away.status,
        ctx.config,
    );
    debug!(
        home = estimate.home,
        draw = estimate.draw,
        away = estimate.away,
        h2h_matches = h2h.total_matches,
        "combined estimate"
    );

    let bands = stat_band::compute(
        store,
        fixture.home_team_id,
        fixture.away_team_id,
        fixture.date,
        ctx.config,
    )?;

    Ok(FixtureEstimate {
        key: fixture.key(),
        estimate,
        bands,
        home_status: home.status,
        away_status: away.status,
    })
}

fn process(
    store: &dyn DataStore,
    cache: &LookupCache,
    fixture: &Fixture,
    cfg: &EngineConfig,
) -> Outcome {
    let key = fixture.key();
    let estimate = match estimate_fixture(store, cache, fixture, cfg) {
        Ok(estimate) => estimate,
        Err(err) if err.is_skip() => {
            warn!(
                date = %key.date,
                home = key.home_team_id,
                away = key.away_team_id,
                "skipping fixture: {err}"
            );
            return Outcome::Skipped;
        }
        Err(err) => {
            warn!(
                date = %key.date,
                home = key.home_team_id,
                away = key.away_team_id,
                "fixture failed: {err}"
            );
            return Outcome::Failed;
        }
    };
    match store.save_estimate(&estimate) {
        Ok(()) => Outcome::Saved,
        Err(err) => {
            warn!(
                date = %key.date,
                home = key.home_team_id,
                away = key.away_team_id,
                "save failed: {err:#}"
            );
            Outcome::SaveFailed
        }
    }
}

fn build_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.clamp(1, 32))
        .build()
        .ok()
}

fn with_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

/// Estimate and save every fixture after `after`. Only the fixture listing
/// itself can fail the batch; per-fixture problems are counted and logged.
pub fn run_batch(
    store: &dyn DataStore,
    after: NaiveDateTime,
    cfg: &EngineConfig,
) -> anyhow::Result<BatchSummary> {
    let started_at = Utc::now();
    let fixtures = store.get_fixtures(after)?;
    info!(fixtures = fixtures.len(), parallelism = cfg.parallelism, "starting batch");

    let cache = LookupCache::new();
    let pool = build_pool(cfg.parallelism);
    let outcomes: Vec<Outcome> = with_pool(&pool, || {
        fixtures
            .par_iter()
            .map(|fixture| process(store, &cache, fixture, cfg))
            .collect()
    });

    let mut summary = BatchSummary {
        started_at,
        finished_at: started_at,
        fixtures: fixtures.len(),
        saved: 0,
        skipped: 0,
        failed: 0,
        save_failures: 0,
    };
    for outcome in outcomes {
        match outcome {
            Outcome::Saved => summary.saved += 1,
            Outcome::Skipped => summary.skipped += 1,
            Outcome::Failed => summary.failed += 1,
            Outcome::SaveFailed => summary.save_failures += 1,
        }
    }
    summary.finished_at = Utc::now();

    if let Err(err) = store.record_run(&summary) {
        warn!("could not record calculation run: {err:#}");
    }
    info!(
        saved = summary.saved,
        skipped = summary.skipped,
        failed = summary.failed,
        save_failures = summary.save_failures,
        "batch finished"
    );
    Ok(summary)
}

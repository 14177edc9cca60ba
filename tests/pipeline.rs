mod common;

use assert_float_eq::*;
use chrono::NaiveDateTime;

use odds_engine::config::EngineConfig;
use odds_engine::context::LookupCache;
use odds_engine::error::EngineError;
use odds_engine::model::{FixtureEstimate, ProbabilityEstimate, SUM_TOLERANCE};
use odds_engine::orchestrator::{estimate_fixture, run_batch};
use odds_engine::reference::ReferenceTable;
use odds_engine::store::{DataStore, MemoryStore};
use odds_engine::tier::TierStatus;

use common::*;

fn after() -> NaiveDateTime {
    day(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap()
}

fn single(store: &MemoryStore) -> Result<FixtureEstimate, EngineError> {
    let cfg = EngineConfig::default();
    estimate_fixture(store, &LookupCache::new(), &store.fixtures[0], &cfg)
}

#[test]
fn team_a_hosting_promoted_team_b() {
    let store = team_a_team_b();
    let out = single(&store).unwrap();

    assert_eq!(out.home_status, TierStatus::Stayed);
    assert_eq!(out.away_status, TierStatus::Promoted);

    // draw_chance = (0.2 + 0.3) / 2, home = (0.6 + 0.4) / 2, away 0.25.
    // B is promoted and holds 0.25 > 0.20: 0.20 leaves B, 0.04 to the draw.
    assert_float_absolute_eq!(out.estimate.home, 0.66, 1e-9);
    assert_float_absolute_eq!(out.estimate.draw, 0.29, 1e-9);
    assert_float_absolute_eq!(out.estimate.away, 0.05, 1e-9);
    assert!(out.estimate.is_normalized());
    assert_eq!(out.bands.len(), 4);
}

#[test]
fn estimates_stay_normalized_and_capped() {
    let cfg = EngineConfig::default();
    let records = [
        (0, 0, 0, 0),
        (10, 10, 0, 0),
        (10, 0, 0, 10),
        (10, 0, 10, 0),
        (38, 20, 10, 8),
        (6, 1, 4, 1),
    ];
    let leagues = [("E0", "E0"), ("E1", "E0"), ("E0", "E1"), ("SP1", "E0")];
    let mut checked = 0;
    for home in records {
        for away in records {
            for (prior_code, h2h_home_wins) in leagues.iter().map(|l| l.0).zip([0u32, 5, 2, 1]) {
                let mut store = base_store();
                store.team_leagues.insert((TEAM_B, PRIOR_SEASON), prior_code.to_string());
                store.standings.insert(
                    (TEAM_A, CURRENT_SEASON),
                    standing(TEAM_A, CURRENT_SEASON, home),
                );
                store.final_standings.insert(
                    (TEAM_A, PRIOR_SEASON),
                    standing(TEAM_A, PRIOR_SEASON, away),
                );
                store.standings.insert(
                    (TEAM_B, CURRENT_SEASON),
                    standing(TEAM_B, CURRENT_SEASON, away),
                );
                for i in 0..h2h_home_wins {
                    store
                        .matches
                        .push(meeting(i as u64, TEAM_A, TEAM_B, day(2020 + i as i32, 3, 1), (2, 0)));
                }
                store.fixtures.push(fixture(TEAM_A, TEAM_B, day(2024, 9, 14)));

                let out = estimate_fixture(&store, &LookupCache::new(), &store.fixtures[0], &cfg)
                    .unwrap()
                    .estimate;
                assert!(
                    (out.sum() - 1.0).abs() <= SUM_TOLERANCE,
                    "sum {} for {home:?} v {away:?}",
                    out.sum()
                );
                assert!(
                    out.max() <= cfg.probability_cap,
                    "max {} for {home:?} v {away:?}",
                    out.max()
                );
                assert!(out.home >= 0.0 && out.draw >= 0.0 && out.away >= 0.0);
                checked += 1;
            }
        }
    }
    assert_eq!(checked, records.len() * records.len() * leagues.len());
}

#[test]
fn two_drawing_sides_do_not_make_a_certain_draw() {
    let mut store = base_store();
    store.team_leagues.insert((TEAM_B, PRIOR_SEASON), "E0".to_string());
    store
        .standings
        .insert((TEAM_A, CURRENT_SEASON), standing(TEAM_A, CURRENT_SEASON, (10, 0, 10, 0)));
    store
        .standings
        .insert((TEAM_B, CURRENT_SEASON), standing(TEAM_B, CURRENT_SEASON, (10, 0, 10, 0)));
    store.fixtures.push(fixture(TEAM_A, TEAM_B, day(2024, 9, 14)));

    let out = single(&store).unwrap().estimate;
    assert_float_absolute_eq!(out.draw, 0.9, 1e-9);
    assert_float_absolute_eq!(out.home, 0.05, 1e-9);
    assert_float_absolute_eq!(out.away, 0.05, 1e-9);
}

#[test]
fn dominant_home_side_is_pulled_back_from_certainty() {
    let mut store = base_store();
    store.team_leagues.insert((TEAM_B, PRIOR_SEASON), "E0".to_string());
    store
        .standings
        .insert((TEAM_A, CURRENT_SEASON), standing(TEAM_A, CURRENT_SEASON, (10, 10, 0, 0)));
    store
        .standings
        .insert((TEAM_B, CURRENT_SEASON), standing(TEAM_B, CURRENT_SEASON, (10, 0, 0, 10)));
    for i in 0..5 {
        store
            .matches
            .push(meeting(i, TEAM_A, TEAM_B, day(2019 + i as i32, 2, 1), (3, 0)));
    }
    store.fixtures.push(fixture(TEAM_A, TEAM_B, day(2024, 9, 14)));

    let out = single(&store).unwrap().estimate;
    assert_float_absolute_eq!(out.home, 0.9, 1e-9);
    assert_float_absolute_eq!(out.draw, 0.03, 1e-9);
    assert_float_absolute_eq!(out.away, 0.07, 1e-9);
}

#[test]
fn no_data_anywhere_is_uniform() {
    let mut store = base_store();
    store.team_leagues.clear();
    store.fixtures.push(fixture(TEAM_A, TEAM_B, day(2024, 9, 14)));
    let out = single(&store).unwrap();
    assert_eq!(out.estimate, ProbabilityEstimate::uniform());
    for band in &out.bands {
        assert!(band.samples.iter().all(|s| s.value == 0.0));
        assert_eq!(band.goal_correlation, 0.0);
    }
}

#[test]
fn reversed_fixtures_do_not_leak_into_head_to_head() {
    let baseline = single(&team_a_team_b()).unwrap();

    let mut reversed = team_a_team_b();
    for i in 0..5 {
        reversed
            .matches
            .push(meeting(i, TEAM_B, TEAM_A, day(2022, 1 + i as u32, 10), (4, 0)));
    }
    assert_eq!(single(&reversed).unwrap(), baseline);

    let mut hosted = team_a_team_b();
    for i in 0..5 {
        hosted
            .matches
            .push(meeting(i, TEAM_A, TEAM_B, day(2022, 1 + i as u32, 10), (0, 4)));
    }
    assert_ne!(single(&hosted).unwrap().estimate, baseline.estimate);
}

#[test]
fn missing_season_or_team_is_skipped() {
    let mut store = team_a_team_b();
    let mut orphan = fixture(TEAM_A, TEAM_B, day(2024, 9, 21));
    orphan.season_id = 42;
    store.fixtures.push(orphan);
    store.fixtures.push(fixture(TEAM_A, 99, day(2024, 9, 28)));

    let cache = LookupCache::new();
    let cfg = EngineConfig::default();
    assert!(matches!(
        estimate_fixture(&store, &cache, &store.fixtures[1], &cfg),
        Err(EngineError::MissingSeason(42))
    ));
    assert!(matches!(
        estimate_fixture(&store, &cache, &store.fixtures[2], &cfg),
        Err(EngineError::MissingTeam(99))
    ));

    let summary = run_batch(&store, after(), &cfg).unwrap();
    assert_eq!(summary.fixtures, 3);
    assert_eq!(summary.saved, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(store.saved().len(), 1);
    assert_eq!(store.runs().len(), 1);
}

#[test]
fn save_failure_does_not_stop_the_batch() {
    let mut store = team_a_team_b();
    store.fixtures.push(fixture(TEAM_B, TEAM_A, day(2024, 12, 1)));
    store.fail_saves.push(store.fixtures[0].key());

    let summary = run_batch(&store, after(), &EngineConfig::default()).unwrap();
    assert_eq!(summary.save_failures, 1);
    assert_eq!(summary.saved, 1);
    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].key, store.fixtures[1].key());
}

#[test]
fn fixtures_before_cutoff_are_ignored() {
    let store = team_a_team_b();
    let late = day(2024, 10, 1).and_hms_opt(0, 0, 0).unwrap();
    let summary = run_batch(&store, late, &EngineConfig::default()).unwrap();
    assert_eq!(summary.fixtures, 0);
    assert!(store.saved().is_empty());
}

#[test]
fn recomputation_is_identical() {
    let mut store = team_a_team_b();
    for i in 0..4 {
        store
            .matches
            .push(meeting(i, TEAM_A, TEAM_B, day(2021 + i as i32, 4, 2), (i as u32, 1)));
    }
    let cfg = EngineConfig::default();
    run_batch(&store, after(), &cfg).unwrap();
    let first = store.list_estimates().unwrap();
    run_batch(&store, after(), &cfg).unwrap();
    let second = store.list_estimates().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn parallel_batch_matches_sequential() {
    let mut store = team_a_team_b();
    for d in 1..20 {
        store.fixtures.push(fixture(TEAM_A, TEAM_B, day(2024, 10, d)));
        store.fixtures.push(fixture(TEAM_B, TEAM_A, day(2024, 11, d)));
    }
    let wide = EngineConfig {
        parallelism: 8,
        ..EngineConfig::default()
    };
    let narrow = EngineConfig {
        parallelism: 1,
        ..EngineConfig::default()
    };
    run_batch(&store, after(), &wide).unwrap();
    let parallel = store.saved();
    run_batch(&store, after(), &narrow).unwrap();
    assert_eq!(store.saved(), parallel);
    assert_eq!(parallel.len(), store.fixtures.len());
}

#[test]
fn reference_snapshot_fills_missing_tables() {
    let mut store = base_store();
    store.teams.push(team(3, "Ipswich Town"));
    store.team_leagues.insert((3, CURRENT_SEASON), "E0".to_string());
    store.team_leagues.insert((3, PRIOR_SEASON), "E0".to_string());
    store
        .standings
        .insert((TEAM_A, CURRENT_SEASON), standing(TEAM_A, CURRENT_SEASON, (10, 5, 3, 2)));
    store.reference = Some(
        ReferenceTable::from_json(
            r#"{
                "teams": [{"team_name": "Ipswich Town FC", "played": 46, "wins": 28, "draws": 12, "losses": 6}],
                "aliases": {}
            }"#,
        )
        .unwrap(),
    );
    store.fixtures.push(fixture(TEAM_A, 3, day(2024, 9, 14)));

    let with_reference = single(&store).unwrap();
    store.reference = None;
    let without = single(&store).unwrap();
    assert_ne!(with_reference.estimate, without.estimate);
    assert!(with_reference.estimate.is_normalized());
}

use anyhow::Result;
use chrono::{Months, NaiveDate};

use crate::config::EngineConfig;
use crate::model::{Match, MatchStatistics, Side, StatBand, StatKey, StatSample, TeamId};
use crate::store::DataStore;

pub const TIME_AXIS: [u16; 7] = [0, 15, 30, 45, 60, 75, 90];
const FULL_TIME: f64 = 90.0;

/// Meetings with statistics, newest first, played before `reference` and no
/// earlier than `years` before it.
fn window<'a>(
    matches: &'a [Match],
    reference: NaiveDate,
    years: u32,
) -> Vec<&'a MatchStatistics> {
    let cutoff = reference
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN);
    let mut rows: Vec<&Match> = matches
        .iter()
        .filter(|m| m.date < reference && m.date >= cutoff)
        .filter(|m| m.statistics.is_some())
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    rows.into_iter().filter_map(|m| m.statistics.as_ref()).collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Pearson coefficient; 0 when undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = mean(xs);
    let my = mean(ys);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return 0.0;
    }
    let r = cov / (vx.sqrt() * vy.sqrt());
    if r.is_finite() { r.clamp(-1.0, 1.0) } else { 0.0 }
}

/// Linear accumulation of `average` over the match with a +/- `band` envelope.
pub fn project(average: f64, band: f64) -> Vec<StatSample> {
    TIME_AXIS
        .iter()
        .map(|&minute| {
            let value = average * minute as f64 / FULL_TIME;
            StatSample {
                minute,
                value,
                low: value * (1.0 - band),
                high: value * (1.0 + band),
            }
        })
        .collect()
}

pub fn band_for(
    matches: &[Match],
    stat: StatKey,
    side: Side,
    reference: NaiveDate,
    cfg: &EngineConfig,
) -> StatBand {
    let values: Vec<f64> = window(matches, reference, cfg.band_window_years)
        .into_iter()
        .map(|s| s.stat(stat, side) as f64)
        .collect();

    let recent: Vec<&MatchStatistics> = window(matches, reference, cfg.corr_window_years)
        .into_iter()
        .take(cfg.corr_max_matches)
        .collect();
    let xs: Vec<f64> = recent.iter().map(|s| s.stat(stat, side) as f64).collect();
    let ys: Vec<f64> = recent.iter().map(|s| s.goals(side) as f64).collect();

    StatBand {
        stat,
        side,
        samples: project(mean(&values), cfg.variance_band),
        goal_correlation: pearson(&xs, &ys),
    }
}

/// One band per tracked stat and side.
pub fn bands(matches: &[Match], reference: NaiveDate, cfg: &EngineConfig) -> Vec<StatBand> {
    let mut out = Vec::with_capacity(StatKey::ALL.len() * Side::BOTH.len());
    for stat in StatKey::ALL {
        for side in Side::BOTH {
            out.push(band_for(matches, stat, side, reference, cfg));
        }
    }
    out
}

pub fn compute(
    store: &dyn DataStore,
    home: TeamId,
    away: TeamId,
    reference: NaiveDate,
    cfg: &EngineConfig,
) -> Result<Vec<StatBand>> {
    let matches = store.get_matches(home, away, None)?;
    Ok(bands(&matches, reference, cfg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FullTimeResult;

    fn meeting(
        id: u64,
        date: &str,
        corners: (u32, u32),
        sot: (u32, u32),
        goals: (u32, u32),
    ) -> Match {
        Match {
            id,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            league_id: None,
            season_id: None,
            home_team_id: 1,
            away_team_id: 2,
            statistics: Some(MatchStatistics {
                full_time_home_goals: goals.0,
                full_time_away_goals: goals.1,
                full_time_result: FullTimeResult::from_goals(goals.0, goals.1),
                half_time_home_goals: 0,
                half_time_away_goals: 0,
                shots_home: sot.0 + 4,
                shots_away: sot.1 + 4,
                shots_on_target_home: sot.0,
                shots_on_target_away: sot.1,
                fouls_home: 10,
                fouls_away: 10,
                corners_home: corners.0,
                corners_away: corners.1,
                yellow_cards_home: 1,
                yellow_cards_away: 1,
                red_cards_home: 0,
                red_cards_away: 0,
            }),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn pearson_undefined_cases_are_zero() {
        assert_eq!(pearson(&[], &[]), 0.0);
        assert_eq!(pearson(&[1.0], &[2.0]), 0.0);
        assert_eq!(pearson(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson(&[1.0, 2.0], &[f64::NAN, 1.0]), 0.0);
    }

    #[test]
    fn pearson_perfect_line() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-12);
    }

    #[test]
    fn projection_is_linear_with_band() {
        let samples = project(9.0, 0.25);
        assert_eq!(samples.len(), TIME_AXIS.len());
        assert_eq!(samples[0].value, 0.0);
        assert_eq!(samples[0].low, 0.0);
        let half = samples.iter().find(|s| s.minute == 45).unwrap();
        assert!((half.value - 4.5).abs() < 1e-12);
        assert!((half.low - 3.375).abs() < 1e-12);
        assert!((half.high - 5.625).abs() < 1e-12);
        assert!((samples[6].value - 9.0).abs() < 1e-12);
    }

    #[test]
    fn average_ignores_meetings_older_than_five_years() {
        let cfg = EngineConfig::default();
        let matches = vec![
            meeting(1, "2015-01-01", (20, 20), (1, 1), (0, 0)),
            meeting(2, "2022-01-01", (6, 2), (4, 2), (1, 0)),
            meeting(3, "2023-01-01", (4, 4), (6, 2), (2, 1)),
        ];
        let band = band_for(&matches, StatKey::Corners, Side::Home, day("2024-06-01"), &cfg);
        let ft = band.samples.last().unwrap();
        assert!((ft.value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_uses_three_recent_meetings_within_three_years() {
        let cfg = EngineConfig::default();
        let matches = vec![
            // Outside the correlation window; would break the perfect fit.
            meeting(1, "2020-01-01", (0, 0), (10, 0), (0, 0)),
            meeting(2, "2022-03-01", (5, 5), (2, 3), (1, 1)),
            meeting(3, "2023-03-01", (5, 5), (4, 3), (2, 1)),
            meeting(4, "2024-03-01", (5, 5), (6, 3), (3, 1)),
        ];
        let band = band_for(
            &matches,
            StatKey::ShotsOnTarget,
            Side::Home,
            day("2024-08-01"),
            &cfg,
        );
        assert!((band.goal_correlation - 1.0).abs() < 1e-12);

        // Away side has constant shots on target: undefined, so zero.
        let away = band_for(
            &matches,
            StatKey::ShotsOnTarget,
            Side::Away,
            day("2024-08-01"),
            &cfg,
        );
        assert_eq!(away.goal_correlation, 0.0);
    }

    #[test]
    fn no_history_gives_flat_zero_bands() {
        let cfg = EngineConfig::default();
        let out = bands(&[], day("2024-08-01"), &cfg);
        assert_eq!(out.len(), 4);
        for band in out {
            assert!(band.samples.iter().all(|s| s.value == 0.0));
            assert_eq!(band.goal_correlation, 0.0);
        }
    }
}

use std::env;
use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "odds_engine";
const DB_FILE: &str = "odds.sqlite";

/// Every tunable of the estimation pipeline. The defaults are the values the
/// model was tuned with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `boost(x)` multiplies values below this by `boost_multiplier`.
    pub boost_threshold: f64,
    pub boost_multiplier: f64,
    /// Prior-season wins/losses are divided by this before blending.
    pub prior_season_divisor: f64,
    /// Prior-season ratio factor when the prior tier sat above the current one.
    pub tier_up_factor: f64,
    /// Prior-season ratio factor when the prior tier sat below the current
    /// one, or the comparison is indeterminate.
    pub tier_down_factor: f64,
    pub promoted_shift: f64,
    pub relegated_shift: f64,
    /// Share of a status shift that goes to the draw.
    pub status_draw_share: f64,
    pub probability_cap: f64,
    pub cap_shift: f64,
    /// Share of the cap shift that goes to the draw.
    pub cap_draw_share: f64,
    pub h2h_limit: usize,
    pub variance_band: f64,
    pub band_window_years: u32,
    pub corr_window_years: u32,
    pub corr_max_matches: usize,
    pub parallelism: usize,
    /// Minimum model-minus-bookmaker edge, in percentage points.
    pub value_threshold_pct: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boost_threshold: 0.8,
            boost_multiplier: 1.25,
            prior_season_divisor: 1.25,
            tier_up_factor: 2.0,
            tier_down_factor: 0.5,
            promoted_shift: 0.20,
            relegated_shift: 0.30,
            status_draw_share: 0.20,
            probability_cap: 0.95,
            cap_shift: 0.10,
            cap_draw_share: 0.30,
            h2h_limit: 5,
            variance_band: 0.25,
            band_window_years: 5,
            corr_window_years: 3,
            corr_max_matches: 3,
            parallelism: 4,
            value_threshold_pct: 7.5,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            boost_threshold: env_f64("ENGINE_BOOST_THRESHOLD", d.boost_threshold, 0.0, 1.0),
            boost_multiplier: env_f64("ENGINE_BOOST_MULTIPLIER", d.boost_multiplier, 1.0, 3.0),
            prior_season_divisor: env_f64(
                "ENGINE_PRIOR_SEASON_DIVISOR",
                d.prior_season_divisor,
                1.0,
                5.0,
            ),
            tier_up_factor: env_f64("ENGINE_TIER_UP_FACTOR", d.tier_up_factor, 1.0, 4.0),
            tier_down_factor: env_f64("ENGINE_TIER_DOWN_FACTOR", d.tier_down_factor, 0.0, 1.0),
            promoted_shift: env_f64("ENGINE_PROMOTED_SHIFT", d.promoted_shift, 0.0, 0.5),
            relegated_shift: env_f64("ENGINE_RELEGATED_SHIFT", d.relegated_shift, 0.0, 0.5),
            status_draw_share: env_f64("ENGINE_STATUS_DRAW_SHARE", d.status_draw_share, 0.0, 1.0),
            probability_cap: env_f64("ENGINE_PROBABILITY_CAP", d.probability_cap, 0.5, 1.0),
            cap_shift: env_f64("ENGINE_CAP_SHIFT", d.cap_shift, 0.0, 0.5),
            cap_draw_share: env_f64("ENGINE_CAP_DRAW_SHARE", d.cap_draw_share, 0.0, 1.0),
            h2h_limit: env_usize("ENGINE_H2H_LIMIT", d.h2h_limit, 1, 50),
            variance_band: env_f64("ENGINE_VARIANCE_BAND", d.variance_band, 0.0, 1.0),
            band_window_years: env_usize(
                "ENGINE_BAND_WINDOW_YEARS",
                d.band_window_years as usize,
                1,
                30,
            ) as u32,
            corr_window_years: env_usize(
                "ENGINE_CORR_WINDOW_YEARS",
                d.corr_window_years as usize,
                1,
                30,
            ) as u32,
            corr_max_matches: env_usize("ENGINE_CORR_MAX_MATCHES", d.corr_max_matches, 2, 50),
            parallelism: env_usize("ENGINE_PARALLELISM", d.parallelism, 1, 32),
            value_threshold_pct: env_f64(
                "ENGINE_VALUE_THRESHOLD_PCT",
                d.value_threshold_pct,
                0.0,
                100.0,
            ),
        }
    }

    pub fn boost(&self, x: f64) -> f64 {
        if x < self.boost_threshold {
            x * self.boost_multiplier
        } else {
            x
        }
    }
}

static ENV_CONFIG: OnceCell<EngineConfig> = OnceCell::new();

/// Process-wide configuration read from the environment on first use.
pub fn env_config() -> &'static EngineConfig {
    ENV_CONFIG.get_or_init(EngineConfig::from_env)
}

/// `$XDG_CACHE_HOME/odds_engine`, falling back to `~/.cache/odds_engine`.
pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(APP_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(raw) = env::var("ODDS_DB_PATH")
        && !raw.trim().is_empty()
    {
        return Some(PathBuf::from(raw.trim()));
    }
    app_data_dir().map(|dir| dir.join(DB_FILE))
}

fn env_f64(key: &str, default: f64, lo: f64, hi: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
        .clamp(lo, hi)
}

fn env_usize(key: &str, default: usize, lo: usize, hi: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
        .clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boost_only_below_threshold() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.boost(0.4), 0.5);
        assert_eq!(cfg.boost(0.8), 0.8);
        assert_eq!(cfg.boost(6.0), 6.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"probability_cap":0.9}"#).unwrap();
        assert_eq!(cfg.probability_cap, 0.9);
        assert_eq!(cfg.h2h_limit, 5);
    }
}

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::performance::SeasonPerformance;
use crate::tier::TierMovement;

/// Which rate a side contributes to the home-win signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalRatio {
    /// Home side: its own wins.
    Wins,
    /// Away side: its losses.
    Losses,
}

/// Recency-weighted rates for one team.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightedRatios {
    /// `weighted_home_win_ratio` for the home side,
    /// `weighted_away_loss_ratio` for the away side.
    pub signal: f64,
    pub draw: f64,
}

/// Scale last season's signal rate by the team's tier move: doubled after
/// moving up, halved after moving down or when the move can't be told.
pub fn adjust_prior_for_tier(
    prior: &SeasonPerformance,
    movement: TierMovement,
    ratio: SignalRatio,
    cfg: &EngineConfig,
) -> SeasonPerformance {
    let factor = match movement {
        TierMovement::Same => return *prior,
        TierMovement::PriorBelow => cfg.tier_up_factor,
        TierMovement::PriorAbove | TierMovement::Indeterminate => cfg.tier_down_factor,
    };
    let mut out = *prior;
    match ratio {
        SignalRatio::Wins => out.wins_ratio *= factor,
        SignalRatio::Losses => out.losses_ratio *= factor,
    }
    out
}

fn blended(
    current_rate: f64,
    current_played: u32,
    prior_rate: f64,
    prior_played: u32,
    cfg: &EngineConfig,
) -> f64 {
    let played = current_played + prior_played;
    if played == 0 {
        return 0.0;
    }
    let current = cfg.boost(current_rate * current_played as f64);
    let prior = (prior_rate * prior_played as f64) / cfg.prior_season_divisor;
    (current + prior) / played as f64
}

pub fn weighted_home_win_ratio(
    current: &SeasonPerformance,
    prior: &SeasonPerformance,
    cfg: &EngineConfig,
) -> f64 {
    blended(current.wins_ratio, current.played, prior.wins_ratio, prior.played, cfg)
}

pub fn weighted_away_loss_ratio(
    current: &SeasonPerformance,
    prior: &SeasonPerformance,
    cfg: &EngineConfig,
) -> f64 {
    blended(current.losses_ratio, current.played, prior.losses_ratio, prior.played, cfg)
}

pub fn weighted_draw_ratio(current: &SeasonPerformance, prior: &SeasonPerformance) -> f64 {
    let played = current.played + prior.played;
    if played == 0 {
        return 0.0;
    }
    (current.draws_ratio * current.played as f64 + prior.draws_ratio * prior.played as f64)
        / played as f64
}

/// Tier adjustment on the prior season, then blending.
pub fn weigh(
    current: &SeasonPerformance,
    prior: &SeasonPerformance,
    movement: TierMovement,
    ratio: SignalRatio,
    cfg: &EngineConfig,
) -> WeightedRatios {
    let prior = adjust_prior_for_tier(prior, movement, ratio, cfg);
    let signal = match ratio {
        SignalRatio::Wins => weighted_home_win_ratio(current, &prior, cfg),
        SignalRatio::Losses => weighted_away_loss_ratio(current, &prior, cfg),
    };
    WeightedRatios {
        signal,
        draw: weighted_draw_ratio(current, &prior),
    }
}

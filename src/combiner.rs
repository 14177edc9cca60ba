use crate::config::EngineConfig;
use crate::head_to_head::HeadToHeadRecord;
use crate::model::{ProbabilityEstimate, Side};
use crate::tier::TierStatus;
use crate::weighting::WeightedRatios;

pub fn draw_chance(home: &WeightedRatios, away: &WeightedRatios, h2h: &HeadToHeadRecord) -> f64 {
    if h2h.is_empty() {
        (home.draw + away.draw) / 2.0
    } else {
        (h2h.draw_ratio + home.draw + away.draw) / 3.0
    }
}

/// `home.signal` is the home side's weighted win ratio and `away.signal` the
/// away side's weighted loss ratio.
pub fn final_home_win_ratio(
    home: &WeightedRatios,
    away: &WeightedRatios,
    h2h: &HeadToHeadRecord,
    cfg: &EngineConfig,
) -> f64 {
    if h2h.is_empty() {
        (home.signal + away.signal) / 2.0
    } else {
        (home.signal + away.signal + cfg.boost(h2h.home_win_ratio)) / 3.0
    }
}

/// Home and draw from the ratios, away as their complement.
pub fn combine(
    home: &WeightedRatios,
    away: &WeightedRatios,
    h2h: &HeadToHeadRecord,
    cfg: &EngineConfig,
) -> ProbabilityEstimate {
    let draw = draw_chance(home, away, h2h);
    let home_win = final_home_win_ratio(home, away, h2h, cfg);
    ProbabilityEstimate::from_home_draw(home_win, draw)
}

fn shift(
    p: ProbabilityEstimate,
    from: Side,
    amount: f64,
    draw_share: f64,
) -> ProbabilityEstimate {
    let to_draw = amount * draw_share;
    let to_other = amount - to_draw;
    match from {
        Side::Home => ProbabilityEstimate {
            home: p.home - amount,
            draw: p.draw + to_draw,
            away: p.away + to_other,
        },
        Side::Away => ProbabilityEstimate {
            home: p.home + to_other,
            draw: p.draw + to_draw,
            away: p.away - amount,
        },
    }
}

/// Move mass off a promoted side facing a stayed or relegated side. Matching
/// statuses and any unknown status leave the estimate alone.
pub fn adjust_ratios_by_status(
    p: ProbabilityEstimate,
    home_status: TierStatus,
    away_status: TierStatus,
    cfg: &EngineConfig,
) -> ProbabilityEstimate {
    use TierStatus::*;

    let (promoted_side, amount) = match (home_status, away_status) {
        (Promoted, Stayed) => (Side::Home, cfg.promoted_shift),
        (Stayed, Promoted) => (Side::Away, cfg.promoted_shift),
        (Promoted, Relegated) => (Side::Home, cfg.relegated_shift),
        (Relegated, Promoted) => (Side::Away, cfg.relegated_shift),
        _ => return p,
    };
    if p.get(promoted_side) <= amount {
        return p;
    }
    shift(p, promoted_side, amount, cfg.status_draw_share)
}

/// Pull an outcome back from near-certainty. A capped draw gives its excess
/// to home and away in equal halves.
pub fn final_95_check(p: ProbabilityEstimate, cfg: &EngineConfig) -> ProbabilityEstimate {
    if p.home >= cfg.probability_cap {
        shift(p, Side::Home, cfg.cap_shift, cfg.cap_draw_share)
    } else if p.away >= cfg.probability_cap {
        shift(p, Side::Away, cfg.cap_shift, cfg.cap_draw_share)
    } else if p.draw >= cfg.probability_cap {
        let half = cfg.cap_shift / 2.0;
        ProbabilityEstimate {
            home: p.home + half,
            draw: p.draw - cfg.cap_shift,
            away: p.away + half,
        }
    } else {
        p
    }
}

fn no_signal(home: &WeightedRatios, away: &WeightedRatios, h2h: &HeadToHeadRecord) -> bool {
    h2h.is_empty()
        && home.signal == 0.0
        && home.draw == 0.0
        && away.signal == 0.0
        && away.draw == 0.0
}

/// Full combination: ratios, reconciliation, status redistribution, cap.
pub fn estimate(
    home: &WeightedRatios,
    away: &WeightedRatios,
    h2h: &HeadToHeadRecord,
    home_status: TierStatus,
    away_status: TierStatus,
    cfg: &EngineConfig,
) -> ProbabilityEstimate {
    if no_signal(home, away, h2h) {
        return ProbabilityEstimate::uniform();
    }
    let raw = combine(home, away, h2h, cfg).reconciled();
    let adjusted = adjust_ratios_by_status(raw, home_status, away_status, cfg);
    final_95_check(adjusted, cfg)
}

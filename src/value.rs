use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::model::{
    BookmakerOdds, FixtureEstimate, FixtureKey, FullTimeResult, ProbabilityEstimate,
};
use crate::store::DataStore;

/// A fixture where the model rates an outcome well above the market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBet {
    pub key: FixtureKey,
    pub model: ProbabilityEstimate,
    pub bookmaker: ProbabilityEstimate,
    /// Percentage points, model minus bookmaker.
    pub diff_home: f64,
    pub diff_draw: f64,
    pub diff_away: f64,
    pub max_diff: f64,
    pub best: FullTimeResult,
    pub best_price: f64,
}

/// Implied probabilities with the overround removed. Every price must be
/// above evens-plus.
pub fn no_vig(odds: &BookmakerOdds) -> Option<ProbabilityEstimate> {
    let prices = [odds.home, odds.draw, odds.away];
    if prices.iter().any(|p| !p.is_finite() || *p <= 1.0) {
        return None;
    }
    let ih = 1.0 / odds.home;
    let id = 1.0 / odds.draw;
    let ia = 1.0 / odds.away;
    let sum = ih + id + ia;
    if sum <= 0.0 {
        return None;
    }
    Some(ProbabilityEstimate {
        home: ih / sum,
        draw: id / sum,
        away: ia / sum,
    })
}

pub fn evaluate(estimate: &FixtureEstimate, odds: &BookmakerOdds) -> Option<ValueBet> {
    let bookmaker = no_vig(odds)?;
    let model = estimate.estimate;
    let diff_home = (model.home - bookmaker.home) * 100.0;
    let diff_draw = (model.draw - bookmaker.draw) * 100.0;
    let diff_away = (model.away - bookmaker.away) * 100.0;

    let mut best = (FullTimeResult::Home, diff_home, odds.home);
    for candidate in [
        (FullTimeResult::Draw, diff_draw, odds.draw),
        (FullTimeResult::Away, diff_away, odds.away),
    ] {
        if candidate.1 > best.1 {
            best = candidate;
        }
    }

    Some(ValueBet {
        key: estimate.key,
        model,
        bookmaker,
        diff_home,
        diff_draw,
        diff_away,
        max_diff: best.1,
        best: best.0,
        best_price: best.2,
    })
}

/// Keep fixtures whose best edge clears `threshold_pct`, largest edge first.
pub fn find_value_bets<F>(
    estimates: &[FixtureEstimate],
    mut odds_for: F,
    threshold_pct: f64,
) -> Result<Vec<ValueBet>>
where
    F: FnMut(&FixtureKey) -> Result<Option<BookmakerOdds>>,
{
    let mut out = Vec::new();
    for estimate in estimates {
        let Some(odds) = odds_for(&estimate.key)? else {
            continue;
        };
        if let Some(bet) = evaluate(estimate, &odds)
            && bet.max_diff > threshold_pct
        {
            out.push(bet);
        }
    }
    out.sort_by(|a, b| {
        b.max_diff
            .total_cmp(&a.max_diff)
            .then_with(|| a.key.cmp(&b.key))
    });
    Ok(out)
}

pub fn value_bets(store: &dyn DataStore, cfg: &EngineConfig) -> Result<Vec<ValueBet>> {
    let estimates = store.list_estimates()?;
    find_value_bets(
        &estimates,
        |key| store.get_bookmaker_odds(key),
        cfg.value_threshold_pct,
    )
}

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Deepest tier the engine holds standings for. A team with no league record
/// for the prior season is assumed to have come up from the tier below this.
pub const LOWEST_MODELED_TIER: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierStatus {
    Stayed,
    Promoted,
    Relegated,
    Unknown,
}

impl TierStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stayed => "stayed",
            Self::Promoted => "promoted",
            Self::Relegated => "relegated",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "stayed" => Self::Stayed,
            "promoted" => Self::Promoted,
            "relegated" => Self::Relegated,
            _ => Self::Unknown,
        }
    }
}

/// Where last season's tier sat relative to this season's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierMovement {
    Same,
    /// Prior tier was higher up the ladder (the team went down).
    PriorAbove,
    /// Prior tier was lower down the ladder (the team came up).
    PriorBelow,
    Indeterminate,
}

/// `"E0"` -> `(Some("E"), Some(0))`. Anything that isn't letters followed by
/// a single digit yields `(None, None)`.
pub fn parse_tier(code: &str) -> (Option<String>, Option<u8>) {
    let code = code.trim();
    let Some(last) = code.chars().last() else {
        return (None, None);
    };
    let country = &code[..code.len() - last.len_utf8()];
    if country.is_empty() || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return (None, None);
    }
    let Some(tier) = last.to_digit(10) else {
        return (None, None);
    };
    (Some(country.to_ascii_uppercase()), Some(tier as u8))
}

fn country_and_tier(code: &str) -> Option<(String, u8)> {
    match parse_tier(code) {
        (Some(country), Some(tier)) => Some((country, tier)),
        _ => None,
    }
}

fn compare(last_code: Option<&str>, current_code: Option<&str>) -> Option<Ordering> {
    let (last_country, last_tier) = country_and_tier(last_code?)?;
    let (current_country, current_tier) = country_and_tier(current_code?)?;
    if last_country != current_country {
        return None;
    }
    Some(last_tier.cmp(&current_tier))
}

pub fn classify(last_code: Option<&str>, current_code: Option<&str>) -> TierStatus {
    match compare(last_code, current_code) {
        None => TierStatus::Unknown,
        Some(Ordering::Equal) => TierStatus::Stayed,
        // Higher tier number now means further from the top flight.
        Some(Ordering::Less) => TierStatus::Relegated,
        Some(Ordering::Greater) => TierStatus::Promoted,
    }
}

/// `classify` with the missing-prior-league rule applied: no record for last
/// season means the team was promoted into its current league.
pub fn classify_team(last_code: Option<&str>, current_code: Option<&str>) -> TierStatus {
    match last_code {
        Some(last) => classify(Some(last), current_code),
        None => TierStatus::Promoted,
    }
}

pub fn movement(last_code: Option<&str>, current_code: Option<&str>) -> TierMovement {
    let Some(last) = last_code else {
        // Assumed to come from below the lowest modeled tier, so always below.
        return match current_code.and_then(country_and_tier) {
            Some(_) => TierMovement::PriorBelow,
            None => TierMovement::Indeterminate,
        };
    };
    match compare(Some(last), current_code) {
        None => TierMovement::Indeterminate,
        Some(Ordering::Equal) => TierMovement::Same,
        Some(Ordering::Less) => TierMovement::PriorAbove,
        Some(Ordering::Greater) => TierMovement::PriorBelow,
    }
}

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::model::SeasonStanding;

/// Minimum Jaro-Winkler score for the approximate fallback.
pub const REFERENCE_MATCH_THRESHOLD: f64 = 0.92;

/// Season id stamped on standings served from the reference snapshot, which
/// has no season of its own in the store.
pub const REFERENCE_SEASON_ID: u32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceRow {
    pub team_name: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    #[serde(default)]
    pub points: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceFile {
    #[serde(default)]
    pub teams: Vec<ReferenceRow>,
    /// Canonical name -> known spelling variants.
    #[serde(default)]
    pub aliases: HashMap<String, Vec<String>>,
}

/// Last-known-season standings for teams the store has no record of, keyed
/// by normalized team name.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    rows: HashMap<String, ReferenceRow>,
    aliases: HashMap<String, String>,
}

impl ReferenceTable {
    pub fn from_file(file: ReferenceFile) -> Self {
        let mut rows = HashMap::new();
        for row in file.teams {
            let key = normalize_name(&row.team_name);
            if !key.is_empty() {
                rows.insert(key, row);
            }
        }
        let mut aliases = HashMap::new();
        for (canonical, variants) in file.aliases {
            let canonical = normalize_name(&canonical);
            if canonical.is_empty() {
                continue;
            }
            for variant in variants {
                let variant = normalize_name(&variant);
                if !variant.is_empty() {
                    aliases.insert(variant, canonical.clone());
                }
            }
        }
        Self { rows, aliases }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read reference file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file = serde_json::from_str::<ReferenceFile>(raw).context("invalid reference json")?;
        Ok(Self::from_file(file))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact normalized name, then alias table, then the closest name above
    /// `REFERENCE_MATCH_THRESHOLD`.
    pub fn lookup(&self, team_name: &str) -> Option<&ReferenceRow> {
        let key = normalize_name(team_name);
        if key.is_empty() {
            return None;
        }
        if let Some(row) = self.rows.get(&key) {
            return Some(row);
        }
        if let Some(row) = self.aliases.get(&key).and_then(|c| self.rows.get(c)) {
            return Some(row);
        }
        self.closest(&key)
    }

    pub fn standing_for(&self, team_id: u32, team_name: &str) -> Option<SeasonStanding> {
        let row = self.lookup(team_name)?;
        Some(SeasonStanding {
            team_id,
            season_id: REFERENCE_SEASON_ID,
            played: row.played,
            wins: row.wins,
            draws: row.draws,
            losses: row.losses,
            points: row.points,
        })
    }

    fn closest(&self, key: &str) -> Option<&ReferenceRow> {
        let mut best: Option<(f64, &str)> = None;
        let candidates = self
            .rows
            .keys()
            .map(String::as_str)
            .chain(self.aliases.keys().map(String::as_str));
        for candidate in candidates {
            let score = jaro_winkler(key, candidate);
            if score < REFERENCE_MATCH_THRESHOLD {
                continue;
            }
            // Ties resolve to the lexicographically smaller name so lookups
            // do not depend on map iteration order.
            let better = match best {
                None => true,
                Some((s, name)) => score > s || (score == s && candidate < name),
            };
            if better {
                best = Some((score, candidate));
            }
        }
        let (_, name) = best?;
        self.rows
            .get(name)
            .or_else(|| self.aliases.get(name).and_then(|c| self.rows.get(c)))
    }
}

/// Lowercase alphanumeric words with club suffixes dropped, joined by a space.
pub fn normalize_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            cleaned.extend(ch.to_lowercase());
        } else {
            cleaned.push(' ');
        }
    }
    cleaned
        .split_whitespace()
        .filter(|w| !matches!(*w, "fc" | "cf" | "afc" | "sc" | "ac" | "club"))
        .collect::<Vec<_>>()
        .join(" ")
}

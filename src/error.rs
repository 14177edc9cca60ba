use thiserror::Error;

use crate::model::{SeasonId, TeamId};

/// Reasons a single fixture produces no estimate. None of these abort a batch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("season {0} not found")]
    MissingSeason(SeasonId),
    #[error("team {0} not found")]
    MissingTeam(TeamId),
    #[error("store query failed: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    /// Missing records mean the fixture is skipped; store errors are failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::MissingSeason(_) | Self::MissingTeam(_))
    }
}

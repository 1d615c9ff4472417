use thiserror::Error;

/// Failures surfaced by matchmaking and outcome processing.
#[derive(Debug, Error)]
pub enum BattleError {
    /// Missing, unknown, or identical song ids in a reported outcome.
    #[error("Invalid outcome: {0}")]
    InvalidOutcome(String),

    #[error("Catalog has {0} song(s), at least 2 are needed to make a battle")]
    InsufficientCatalog(usize),

    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BattleError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        BattleError::InvalidOutcome(reason.into())
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BattleError::Storage(Box::new(err))
    }

    /// True when the caller sent something wrong, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, BattleError::InvalidOutcome(_))
    }
}

pub type Result<T, E = BattleError> = std::result::Result<T, E>;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::{AiVote, TokenCandidate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),
}

/// Cost/reliability tier of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTier {
    FreeReliable,
    FreeLimited,
    Paid,
}

impl fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderTier::FreeReliable => "free-reliable",
            ProviderTier::FreeLimited => "free-limited",
            ProviderTier::Paid => "paid",
        };
        write!(f, "{}", s)
    }
}

/// One independent AI advisor
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn id(&self) -> &str;

    fn tier(&self) -> ProviderTier;

    /// Lower value is asked first
    fn priority(&self) -> u32;

    /// Ask for a recommendation on `candidate`.
    ///
    /// `risk_tolerance` is 0.0 - 1.0. The returned vote carries no error;
    /// failures are reported through `Err`.
    async fn analyze(
        &self,
        candidate: &TokenCandidate,
        risk_tolerance: f64,
        budget_sol: f64,
    ) -> Result<AiVote, ProviderError>;
}
